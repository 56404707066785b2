//! Route configuration for the CareBridge server.

mod auth;
mod pages;
mod patients;

use crate::{middleware::GuardLayer, state::AppState};
use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use carebridge_auth::{PageGuard, Role, RoleSet};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

pub use auth::{LoginForm, RegisterForm};
pub use pages::{DashboardPage, PublicPage};
pub use patients::ImportForm;

/// Roles admitted to the hospital area. Must contain the administrators:
/// `AdminLanding::HospitalDashboard` sends them here.
pub const HOSPITAL_AREA: RoleSet = RoleSet::single(Role::HospitalStaff).union(RoleSet::ADMINISTRATORS);

/// Create the main application router.
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let common_middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(CatchPanicLayer::new())
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .route("/", get(pages::home))
        .route("/login", get(pages::login))
        .nest("/auth", auth_router())
        .merge(protected_router(state.clone()))
        .fallback(fallback_handler)
        .layer(common_middleware)
        .with_state(state)
}

fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
}

fn protected_router(state: AppState) -> Router<AppState> {
    let guarded = |page: &'static str, allowed: RoleSet| {
        GuardLayer::new(state.clone(), PageGuard::new(page, allowed))
    };

    Router::new()
        .route(
            "/patient/dashboard",
            get(pages::patient_dashboard)
                .route_layer(guarded("patient_dashboard", RoleSet::single(Role::Patient))),
        )
        .route(
            "/hospital/dashboard",
            get(pages::hospital_dashboard).route_layer(guarded("hospital_dashboard", HOSPITAL_AREA)),
        )
        .route(
            "/hospital/patients/import",
            post(patients::import_patient).route_layer(guarded("patient_import", HOSPITAL_AREA)),
        )
        .route(
            "/police/dashboard",
            get(pages::police_dashboard)
                .route_layer(guarded("police_dashboard", RoleSet::single(Role::Police))),
        )
        .route(
            "/admin/dashboard",
            get(pages::admin_dashboard)
                .route_layer(guarded("admin_dashboard", RoleSet::ADMINISTRATORS)),
        )
}

async fn fallback_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        axum::Json(serde_json::json!({
            "error": "not_found",
            "message": "The requested resource was not found"
        })),
    )
}

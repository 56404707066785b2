//! Sign-in, registration and sign-out.

use crate::{error::ApiResult, middleware::extract_token, state::AppState};
use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use carebridge_auth::{PatientRegistration, RoutePath, Session, SessionStore};
use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> ApiResult<Response> {
    form.validate()?;

    let sessions = state.open_session(None);
    let session = sessions
        .sign_in_with_password(form.email.trim(), &form.password)
        .await?;
    info!(user_id = %session.user_id, "Signed in");

    Ok(land(&state, jar, sessions.as_ref(), &session).await)
}

/// `POST /auth/register`
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> ApiResult<Response> {
    form.validate()?;

    let registration = PatientRegistration {
        email: form.email.trim().to_string(),
        password: form.password,
        full_name: form.full_name.trim().to_string(),
        phone: form.phone.filter(|p| !p.trim().is_empty()),
    };
    let sessions = state.open_session(None);
    let session = registration
        .register(sessions.as_ref(), state.profiles.as_ref())
        .await?;

    Ok(land(&state, jar, sessions.as_ref(), &session).await)
}

/// Post-login navigation shared by sign-in and registration.
async fn land(
    state: &AppState,
    jar: CookieJar,
    sessions: &dyn SessionStore,
    session: &Session,
) -> Response {
    let resolved = state.resolver.resolve_current_profile(sessions).await;
    let location = state
        .router
        .after_sign_in(&resolved)
        .location()
        .unwrap_or_else(|| RoutePath::Home.as_str().to_string());

    (jar.add(state.session_cookie(session)), Redirect::to(&location)).into_response()
}

/// `POST /auth/logout`
///
/// Sign-out is not awaited; the cookie is cleared and the viewer leaves
/// for the login page whatever the backend answers.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap, jar: CookieJar) -> Response {
    if let Some(token) = extract_token(&headers) {
        let sessions = state.open_session(Some(token));
        tokio::spawn(async move {
            if let Err(e) = sessions.sign_out().await {
                warn!(error = %e, "Sign-out failed");
            }
        });
    }

    let location = state
        .router
        .after_sign_out()
        .location()
        .unwrap_or_else(|| RoutePath::Login.as_str().to_string());
    (jar.add(state.cleared_session_cookie()), Redirect::to(&location)).into_response()
}


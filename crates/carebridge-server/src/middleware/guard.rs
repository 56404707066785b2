//! Page guard middleware layer.

use super::token::extract_token;
use crate::{error::ApiError, state::AppState};
use axum::{
    async_trait,
    body::Body,
    extract::FromRequestParts,
    http::{header, request::Parts, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use carebridge_auth::{Navigation, PageGuard, UserProfile};
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Gates a route behind a [`PageGuard`].
#[derive(Clone)]
pub struct GuardLayer {
    state: AppState,
    guard: PageGuard,
}

impl GuardLayer {
    pub fn new(state: AppState, guard: PageGuard) -> Self {
        Self { state, guard }
    }
}

impl<S> Layer<S> for GuardLayer {
    type Service = GuardMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GuardMiddleware {
            inner,
            state: self.state.clone(),
            guard: self.guard.clone(),
        }
    }
}

#[derive(Clone)]
pub struct GuardMiddleware<S> {
    inner: S,
    state: AppState,
    guard: PageGuard,
}

impl<S> Service<Request<Body>> for GuardMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let state = self.state.clone();
        let guard = self.guard.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let sessions = state.open_session(extract_token(req.headers()));
            let outcome = guard
                .run(&state.resolver, &state.router, sessions.as_ref())
                .await;

            match (outcome.navigation, outcome.profile) {
                (Navigation::Render, Some(profile)) => {
                    req.extensions_mut().insert(CurrentProfile(profile));
                    inner.call(req).await
                }
                (navigation, _) => Ok(redirect_response(&navigation)),
            }
        })
    }
}

/// `303 See Other` to wherever the guard sent the viewer.
pub(crate) fn redirect_response(navigation: &Navigation) -> Response {
    let Some(location) = navigation.location() else {
        return ApiError::Unauthorized.into_response();
    };
    let notice = match navigation {
        Navigation::Redirect {
            notice: Some(notice),
            ..
        } => json!({ "code": notice.code(), "message": notice.message() }),
        _ => serde_json::Value::Null,
    };
    let body = json!({
        "success": false,
        "redirect": location,
        "notice": notice,
    });
    (
        StatusCode::SEE_OTHER,
        [(header::LOCATION, location)],
        Json(body),
    )
        .into_response()
}

/// Profile of the viewer, inserted by [`GuardLayer`] once authorized.
#[derive(Debug, Clone)]
pub struct CurrentProfile(pub UserProfile);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentProfile
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentProfile>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}

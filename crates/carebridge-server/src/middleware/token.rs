//! Access-token extraction.

use crate::state::ACCESS_TOKEN_COOKIE;
use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::CookieJar;
use carebridge_auth::AccessToken;

/// Token presented by the client: `Authorization: Bearer` first, then the
/// session cookie. A missing or malformed token is not an error; the
/// request simply has no session.
pub fn extract_token(headers: &HeaderMap) -> Option<AccessToken> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_credentials)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(AccessToken::new(token));
    }

    CookieJar::from_headers(headers)
        .get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value())
        .filter(|token| !token.is_empty())
        .map(AccessToken::new)
}

/// Credentials of a `Bearer` authorization value. The scheme is
/// case-insensitive.
fn bearer_credentials(value: &str) -> Option<&str> {
    let (scheme, credentials) = value.trim_start().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| credentials.trim())
}

//! Client for the hosted backend-as-a-service.
//!
//! Auth calls go to the GoTrue-style `/auth/v1` API; profile rows come from
//! the PostgREST-style `/rest/v1/users` table. Every request carries the
//! project's `apikey` header; table calls are authorized with the user's own
//! access token.

use async_trait::async_trait;
use carebridge_common_core::{ProfileRow, UserId};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use parking_lot::Mutex;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    error::{AuthError, BackendError},
    session::{AccessToken, ProfileDirectory, Session, SessionFactory, SessionStore, SignUpAttributes},
};

const PROFILE_COLUMNS: &str = "id,full_name,email,phone,user_type";

/// Hosted backend configuration.
#[derive(Debug, Clone)]
pub struct HostedConfig {
    /// Project URL, e.g. `https://abc.backend.example`.
    pub base_url: String,
    /// Project API key sent as `apikey` on every request.
    pub api_key: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub request_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl HostedConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl Default for HostedConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            user_agent: format!("carebridge/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Shared hosted-backend client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HostedBackend {
    http: Client,
    config: Arc<HostedConfig>,
}

impl HostedBackend {
    /// Build a client for the given project.
    pub fn new(config: HostedConfig) -> Result<Self, BackendError> {
        let http = ClientBuilder::new()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(BackendError::ClientBuild)?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &HostedConfig {
        &self.config
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.config.api_key)
    }

    fn user_scoped(&self, builder: RequestBuilder, token: &AccessToken) -> RequestBuilder {
        self.request(builder).bearer_auth(token.as_str())
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, BackendError> {
        builder.send().await.map_err(|e| self.transport_error(e))
    }

    fn transport_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout(self.config.request_timeout)
        } else {
            BackendError::from(e)
        }
    }

    async fn token_request(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let url = self.config.endpoint("/auth/v1/token");
        debug!(%url, "Signing in with password");

        let response = self
            .send(
                self.request(self.http.post(&url))
                    .query(&[("grant_type", "password")])
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejection(response).await);
        }

        let body: TokenResponse = response.json().await.map_err(|e| self.transport_error(e))?;
        body.into_session().ok_or(AuthError::Backend(BackendError::Decode(
            "token response carried no session".into(),
        )))
    }

    async fn signup_request(
        &self,
        email: &str,
        password: &str,
        attributes: &SignUpAttributes,
    ) -> Result<Session, AuthError> {
        let url = self.config.endpoint("/auth/v1/signup");
        debug!(%url, user_type = %attributes.user_type, "Creating account");

        let response = self
            .send(self.request(self.http.post(&url)).json(&json!({
                "email": email,
                "password": password,
                "data": attributes,
            })))
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        // Projects that require email confirmation answer with the bare user
        // object and no session.
        let body: TokenResponse = response.json().await.map_err(|e| self.transport_error(e))?;
        body.into_session().ok_or(AuthError::ConfirmationPending)
    }

    async fn user_request(&self, token: &AccessToken) -> Result<Option<Session>, BackendError> {
        let url = self.config.endpoint("/auth/v1/user");
        let response = self
            .send(self.user_scoped(self.http.get(&url), token))
            .await?;

        match response.status() {
            status if status.is_success() => {
                let user: UserBody = response.json().await.map_err(|e| self.transport_error(e))?;
                let user_id = UserId::parse(&user.id)
                    .map_err(|e| BackendError::Decode(e.to_string()))?;
                Ok(Some(Session {
                    access_token: token.clone(),
                    user_id,
                    email: user.email,
                    expires_at: None,
                }))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!("Access token rejected by auth service");
                Ok(None)
            }
            status => Err(status_error(status, response).await),
        }
    }

    async fn logout_request(&self, token: &AccessToken) -> Result<(), BackendError> {
        let url = self.config.endpoint("/auth/v1/logout");
        let response = self
            .send(self.user_scoped(self.http.post(&url), token))
            .await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            Ok(())
        } else {
            Err(status_error(status, response).await)
        }
    }
}

impl SessionFactory for HostedBackend {
    fn open(&self, token: Option<AccessToken>) -> Box<dyn SessionStore> {
        Box::new(HostedSession {
            backend: self.clone(),
            token: Mutex::new(token),
        })
    }
}

#[async_trait]
impl ProfileDirectory for HostedBackend {
    async fn fetch_profile_by_id(
        &self,
        token: &AccessToken,
        id: &UserId,
    ) -> Result<Option<ProfileRow>, BackendError> {
        let url = self.config.endpoint("/rest/v1/users");
        let response = self
            .send(
                self.user_scoped(self.http.get(&url), token)
                    .query(&[("id", format!("eq.{id}")), ("select", PROFILE_COLUMNS.to_string())]),
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }

        let mut rows: Vec<ProfileRow> = response.json().await.map_err(|e| self.transport_error(e))?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            n => {
                warn!(user_id = %id, rows = n, "Multiple profile rows for one user");
                Err(BackendError::Decode(format!("{n} profile rows for user {id}")))
            }
        }
    }

    async fn insert_profile(&self, token: &AccessToken, row: &ProfileRow) -> Result<(), BackendError> {
        let url = self.config.endpoint("/rest/v1/users");
        let response = self
            .send(
                self.user_scoped(self.http.post(&url), token)
                    .header("Prefer", "return=minimal")
                    .json(row),
            )
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(status, response).await)
        }
    }
}

/// A client's view of the hosted auth service.
pub struct HostedSession {
    backend: HostedBackend,
    token: Mutex<Option<AccessToken>>,
}

#[async_trait]
impl SessionStore for HostedSession {
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        let token = self.token.lock().clone();
        match token {
            Some(token) => self.backend.user_request(&token).await,
            None => Ok(None),
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.backend.token_request(email, password).await?;
        *self.token.lock() = Some(session.access_token.clone());
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        attributes: &SignUpAttributes,
    ) -> Result<Session, AuthError> {
        let session = self.backend.signup_request(email, password, attributes).await?;
        *self.token.lock() = Some(session.access_token.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let token = self.token.lock().take();
        match token {
            Some(token) => self.backend.logout_request(&token).await,
            None => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserBody {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    user: Option<UserBody>,
}

impl TokenResponse {
    fn into_session(self) -> Option<Session> {
        let access_token = AccessToken::new(self.access_token?);
        let user = self.user?;
        let user_id = UserId::parse(&user.id).ok()?;

        let expires_at: Option<DateTime<Utc>> = match (self.expires_at, self.expires_in) {
            (Some(at), _) => Utc.timestamp_opt(at, 0).single(),
            (None, Some(secs)) => Some(Utc::now() + ChronoDuration::seconds(secs)),
            (None, None) => None,
        };

        Some(Session {
            access_token,
            user_id,
            email: user.email,
            expires_at,
        })
    }
}

/// Pull the human-readable message out of an auth error body.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()).map(String::from))
}

/// Machine-readable `error_code` of an auth error body, if any.
fn error_code(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("error_code")?.as_str().map(String::from)
}

async fn rejection(response: Response) -> AuthError {
    let status = response.status();
    if status.is_server_error() {
        return AuthError::Backend(status_error(status, response).await);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Request rejected")
            .to_string()
    });
    let rejected = AuthError::rejected(status.as_u16(), message);
    match error_code(&body) {
        Some(code) => rejected.with_code(code),
        None => rejected,
    }
}

async fn status_error(status: StatusCode, response: Response) -> BackendError {
    let body = response.text().await.unwrap_or_default();
    BackendError::Status {
        status: status.as_u16(),
        body,
    }
}

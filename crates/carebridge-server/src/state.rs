//! Shared application state.

use crate::config::{AuthConfig, BackendKind, ServerConfig};
use axum_extra::extract::cookie::{Cookie, SameSite};
use carebridge_auth::{
    AccessToken, HostedBackend, HostedConfig, MemoryBackend, ProfileDirectory, ProfileResolver,
    RoleRouter, Session, SessionFactory, SessionStore,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Name of the cookie carrying the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// State shared by every handler and guard layer. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionFactory>,
    pub profiles: Arc<dyn ProfileDirectory>,
    pub resolver: Arc<ProfileResolver>,
    pub router: RoleRouter,
    cookies: CookieSettings,
}

#[derive(Debug, Clone, Copy)]
struct CookieSettings {
    secure: bool,
    max_age_secs: i64,
}

impl AppState {
    /// Build state for the configured backend.
    pub fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        match config.backend.kind {
            BackendKind::Memory => {
                info!("Using in-memory backend");
                let backend = Arc::new(MemoryBackend::new());
                Ok(Self::with_backends(backend.clone(), backend, &config.auth))
            }
            BackendKind::Hosted => {
                info!(url = %config.backend.url, "Using hosted backend");
                let hosted = HostedConfig {
                    request_timeout: Duration::from_secs(config.backend.request_timeout_secs),
                    ..HostedConfig::new(&config.backend.url, &config.backend.api_key)
                };
                let backend = Arc::new(HostedBackend::new(hosted)?);
                Ok(Self::with_backends(backend.clone(), backend, &config.auth))
            }
        }
    }

    /// Build state over explicit collaborators.
    pub fn with_backends(
        sessions: Arc<dyn SessionFactory>,
        profiles: Arc<dyn ProfileDirectory>,
        auth: &AuthConfig,
    ) -> Self {
        let resolver =
            ProfileResolver::new(profiles.clone()).with_timeout(auth.resolution_timeout());
        Self {
            sessions,
            profiles,
            resolver: Arc::new(resolver),
            router: RoleRouter::new(auth.admin_landing),
            cookies: CookieSettings {
                secure: auth.secure_cookies,
                max_age_secs: auth.session_cookie_max_age_secs,
            },
        }
    }

    /// Cookie carrying a freshly issued session token.
    pub fn session_cookie(&self, session: &Session) -> Cookie<'static> {
        Cookie::build((ACCESS_TOKEN_COOKIE, session.access_token.as_str().to_owned()))
            .path("/")
            .http_only(true)
            .secure(self.cookies.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.cookies.max_age_secs))
            .build()
    }

    /// Expired, empty cookie that clears the session token.
    pub fn cleared_session_cookie(&self) -> Cookie<'static> {
        Cookie::build((ACCESS_TOKEN_COOKIE, ""))
            .path("/")
            .http_only(true)
            .secure(self.cookies.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::ZERO)
            .build()
    }

    /// Open a request-scoped session handle.
    pub fn open_session(&self, token: Option<AccessToken>) -> Box<dyn SessionStore> {
        self.sessions.open(token)
    }
}

//! Server configuration types.

use carebridge_auth::AdminLanding;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Main server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server binding configuration.
    pub server: ServerBindConfig,
    /// Hosted backend configuration.
    pub backend: BackendConfig,
    /// Session resolution and cookie configuration.
    pub auth: AuthConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server binding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerBindConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Request timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

impl ServerBindConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Which backend implementation to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-process accounts and profiles; data is lost on restart.
    #[default]
    Memory,
    /// The hosted auth and table APIs.
    Hosted,
}

/// Hosted backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
    /// Project URL.
    #[serde(default)]
    pub url: String,
    /// Project API key.
    #[serde(default)]
    pub api_key: String,
    /// Whole-request timeout for backend calls.
    #[serde(default = "default_backend_timeout")]
    pub request_timeout_secs: u64,
}

fn default_backend_timeout() -> u64 {
    10
}

/// Session resolution and cookie configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Bound on each backend call made while resolving a profile.
    #[serde(default = "default_resolution_timeout")]
    pub resolution_timeout_ms: u64,
    /// Landing page for `admin` and `super_admin`.
    #[serde(default)]
    pub admin_landing: AdminLanding,
    /// Mark the session cookie `Secure`.
    #[serde(default = "default_true")]
    pub secure_cookies: bool,
    /// Lifetime of the session cookie.
    #[serde(default = "default_cookie_max_age")]
    pub session_cookie_max_age_secs: i64,
}

fn default_resolution_timeout() -> u64 {
    5000
}

fn default_cookie_max_age() -> i64 {
    3600
}

fn default_true() -> bool {
    true
}

impl AuthConfig {
    pub fn resolution_timeout(&self) -> Duration {
        Duration::from_millis(self.resolution_timeout_ms)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            resolution_timeout_ms: default_resolution_timeout(),
            admin_landing: AdminLanding::default(),
            secure_cookies: true,
            session_cookie_max_age_secs: default_cookie_max_age(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty, compact or json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ServerConfig {
    /// Configuration for an in-memory server, used by tests and local runs.
    pub fn in_memory() -> Self {
        Self {
            server: ServerBindConfig {
                host: "127.0.0.1".to_string(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
            },
            backend: BackendConfig {
                kind: BackendKind::Memory,
                url: String::new(),
                api_key: String::new(),
                request_timeout_secs: default_backend_timeout(),
            },
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

//! Configuration validation.

use super::types::{BackendKind, ServerConfig};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Hosted backend selected but backend.url is empty")]
    MissingBackendUrl,

    #[error("Invalid backend URL: {0}")]
    InvalidBackendUrl(String),

    #[error("Hosted backend selected but backend.api_key is empty")]
    MissingApiKey,

    #[error("Invalid port: {0}")]
    InvalidPort(u16),

    #[error("auth.resolution_timeout_ms must be greater than zero")]
    InvalidResolutionTimeout,

    #[error("auth.session_cookie_max_age_secs must be greater than zero")]
    InvalidCookieMaxAge,

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}")]
    InvalidLogFormat(String),
}

/// Validate server configuration, collecting every violation.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.backend.kind == BackendKind::Hosted {
        let url = config.backend.url.trim();
        if url.is_empty() {
            errors.push(ConfigError::MissingBackendUrl);
        } else if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ConfigError::InvalidBackendUrl(url.to_string()));
        }
        if config.backend.api_key.trim().is_empty() {
            errors.push(ConfigError::MissingApiKey);
        }
    }

    if config.server.port == 0 {
        errors.push(ConfigError::InvalidPort(0));
    }

    if config.auth.resolution_timeout_ms == 0 {
        errors.push(ConfigError::InvalidResolutionTimeout);
    }

    if config.auth.session_cookie_max_age_secs <= 0 {
        errors.push(ConfigError::InvalidCookieMaxAge);
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.to_lowercase().as_str()) {
        errors.push(ConfigError::InvalidLogLevel(config.logging.level.clone()));
    }

    let valid_formats = ["pretty", "compact", "json"];
    if !valid_formats.contains(&config.logging.format.to_lowercase().as_str()) {
        errors.push(ConfigError::InvalidLogFormat(config.logging.format.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

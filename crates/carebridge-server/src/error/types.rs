//! API error types.

use axum::http::StatusCode;
use carebridge_auth::{AuthError, RegistrationError};
use std::collections::HashMap;
use thiserror::Error;

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// API error enum covering all error cases.
#[derive(Debug, Error)]
pub enum ApiError {
    // 400 Bad Request
    #[error("Validation failed")]
    ValidationError(HashMap<String, Vec<String>>),

    // 401 Unauthorized
    #[error("Authentication required")]
    Unauthorized,

    /// Message comes from the auth backend and is shown as-is.
    #[error("{0}")]
    InvalidCredentials(String),

    // 202 Accepted: the account exists, sign-in waits on email confirmation
    #[error("Confirm the email address before signing in")]
    ConfirmationPending,

    // 409 Conflict
    #[error("{0}")]
    DuplicateAccount(String),

    // 422 Unprocessable Entity
    #[error("{0}")]
    Rejected(String),

    // 502 Bad Gateway
    #[error("Upstream service error: {0}")]
    UpstreamError(String),
}

impl ApiError {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,

            Self::Unauthorized | Self::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,

            Self::ConfirmationPending => StatusCode::ACCEPTED,

            Self::DuplicateAccount(_) => StatusCode::CONFLICT,

            Self::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,

            Self::UpstreamError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Get error code for client handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ValidationError(_) => "validation_error",
            Self::Unauthorized => "unauthorized",
            Self::InvalidCredentials(_) => "invalid_credentials",
            Self::DuplicateAccount(_) => "duplicate_account",
            Self::ConfirmationPending => "confirmation_pending",
            Self::Rejected(_) => "rejected",
            Self::UpstreamError(_) => "upstream_error",
        }
    }

    /// Check if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Map a sign-up failure. Sign-in failures go through `From<AuthError>`.
    pub fn from_sign_up(err: AuthError) -> Self {
        if err.is_duplicate_account() {
            return Self::DuplicateAccount(err.to_string());
        }
        match err {
            AuthError::Rejected { message, .. } => Self::Rejected(message),
            other => Self::from(other),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Rejected { message, .. } => Self::InvalidCredentials(message),
            AuthError::ConfirmationPending => Self::ConfirmationPending,
            AuthError::Backend(e) => Self::UpstreamError(e.to_string()),
        }
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::InvalidNationalId => {
                let mut fields = HashMap::new();
                fields.insert("national_id".to_string(), vec![err.to_string()]);
                Self::ValidationError(fields)
            }
            RegistrationError::Auth(e) => Self::from_sign_up(e),
            RegistrationError::Profile(e) => Self::UpstreamError(e.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        Self::ValidationError(fields)
    }
}

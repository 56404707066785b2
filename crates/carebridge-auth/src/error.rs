//! Error types for the access core.

use std::time::Duration;
use thiserror::Error;

/// Transport-level failures talking to the hosted backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::Decode(e.to_string())
        } else {
            BackendError::Request(e)
        }
    }
}

/// Backend error code for a sign-up whose email is taken.
pub const USER_ALREADY_EXISTS: &str = "user_already_exists";

/// Sign-in and sign-up failures.
///
/// `Rejected` carries the backend's own message so it can be shown to the
/// user as-is ("Invalid login credentials", "User already registered"),
/// plus its machine-readable `error_code` when the body had one.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("account created; confirm the email address before signing in")]
    ConfirmationPending,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl AuthError {
    /// Build a rejection carrying the backend's message.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            code: None,
            message: message.into(),
        }
    }

    /// Attach the backend's error code to a rejection.
    pub fn with_code(self, error_code: impl Into<String>) -> Self {
        match self {
            Self::Rejected {
                status, message, ..
            } => Self::Rejected {
                status,
                code: Some(error_code.into()),
                message,
            },
            other => other,
        }
    }

    /// Whether the backend refused because the account already exists.
    ///
    /// Status alone says nothing: weak passwords and malformed emails are
    /// 422 too.
    pub fn is_duplicate_account(&self) -> bool {
        match self {
            Self::Rejected { code, message, .. } => {
                code.as_deref() == Some(USER_ALREADY_EXISTS)
                    || message.to_lowercase().contains("already registered")
            }
            _ => false,
        }
    }
}

/// Why the current session could not be resolved to a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ResolutionError {
    /// No session exists.
    #[error("not signed in")]
    NotAuthenticated,

    /// A session exists but no usable profile backs it.
    #[error("no usable profile for the current session")]
    ProfileMissing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_displays_backend_message_verbatim() {
        let err = AuthError::rejected(400, "Invalid login credentials");
        assert_eq!(err.to_string(), "Invalid login credentials");
        assert!(!err.is_duplicate_account());
    }

    #[test]
    fn test_duplicate_account_detection() {
        assert!(AuthError::rejected(422, "User already registered").is_duplicate_account());
        assert!(AuthError::rejected(400, "User already registered").is_duplicate_account());
        assert!(AuthError::rejected(422, "Email taken")
            .with_code(USER_ALREADY_EXISTS)
            .is_duplicate_account());
        assert!(!AuthError::ConfirmationPending.is_duplicate_account());
    }

    #[test]
    fn test_weak_password_is_not_duplicate() {
        let err = AuthError::rejected(422, "Password should be at least 8 characters.")
            .with_code("weak_password");
        assert!(!err.is_duplicate_account());
        assert!(!AuthError::rejected(409, "Conflict").is_duplicate_account());
        assert_eq!(err.to_string(), "Password should be at least 8 characters.");
    }

    #[test]
    fn test_backend_status_display() {
        let err = BackendError::Status {
            status: 503,
            body: "upstream down".into(),
        };
        let text = err.to_string();
        assert!(text.contains("503"));
        assert!(text.contains("upstream down"));
    }
}

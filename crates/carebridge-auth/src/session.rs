//! Session types and the collaborator traits of the hosted backend.

use async_trait::async_trait;
use carebridge_common_core::{ProfileRow, Role, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AuthError, BackendError};

/// Bearer token issued by the auth service.
///
/// `Debug` never prints the token itself.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// A session as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: AccessToken,
    /// Subject of the session; keys the `users` table.
    pub user_id: UserId,
    pub email: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Whether the auth service's expiry has passed.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

/// Extra attributes stored with a new account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpAttributes {
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub user_type: Role,
}

/// The auth service, seen through one client's session.
///
/// A handle tracks at most one session. `get_session` is idempotent and
/// reflects the latest `sign_in_with_password`, `sign_up` or `sign_out`
/// made through the same handle.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current session, if any.
    async fn get_session(&self) -> Result<Option<Session>, BackendError>;

    /// Exchange credentials for a session.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Create an account and start its session.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        attributes: &SignUpAttributes,
    ) -> Result<Session, AuthError>;

    /// End the current session.
    async fn sign_out(&self) -> Result<(), BackendError>;
}

/// Opens request-scoped [`SessionStore`] handles.
pub trait SessionFactory: Send + Sync {
    /// Open a handle, seeded with the token a client presented.
    fn open(&self, token: Option<AccessToken>) -> Box<dyn SessionStore>;
}

/// The `users` table.
///
/// Calls are made as the signed-in user: `token` is that user's access
/// token, so row-level policies on the table apply to them.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    /// Fetch the row keyed by `id`. `Ok(None)` means zero rows.
    async fn fetch_profile_by_id(
        &self,
        token: &AccessToken,
        id: &UserId,
    ) -> Result<Option<ProfileRow>, BackendError>;

    /// Insert the row for a freshly registered account.
    async fn insert_profile(&self, token: &AccessToken, row: &ProfileRow) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("eyJhbGciOi.secret.sig");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("secret"));
        assert_eq!(token.as_str(), "eyJhbGciOi.secret.sig");
    }

    #[test]
    fn test_session_expiry() {
        let mut session = Session {
            access_token: AccessToken::new("t"),
            user_id: UserId::new(),
            email: None,
            expires_at: None,
        };
        assert!(!session.is_expired());

        session.expires_at = Some(Utc::now() - Duration::seconds(5));
        assert!(session.is_expired());

        session.expires_at = Some(Utc::now() + Duration::hours(1));
        assert!(!session.is_expired());
    }

    #[test]
    fn test_sign_up_attributes_serialize_user_type() {
        let attrs = SignUpAttributes {
            full_name: "Musa Bello".into(),
            phone: None,
            user_type: Role::Patient,
        };
        let value = serde_json::to_value(&attrs).unwrap();
        assert_eq!(value["user_type"], "patient");
        assert!(value.get("phone").is_none());
    }
}

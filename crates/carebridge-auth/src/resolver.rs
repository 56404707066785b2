//! Session to profile resolution.

use carebridge_common_core::UserProfile;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::{
    error::ResolutionError,
    session::{ProfileDirectory, SessionStore},
};

/// Default bound on each backend call made while resolving.
pub const DEFAULT_RESOLUTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves the profile behind the current session.
///
/// Backend failures never escape: anything that is not a clean "no session"
/// becomes [`ResolutionError::ProfileMissing`].
#[derive(Clone)]
pub struct ProfileResolver {
    profiles: Arc<dyn ProfileDirectory>,
    call_timeout: Duration,
}

impl ProfileResolver {
    pub fn new(profiles: Arc<dyn ProfileDirectory>) -> Self {
        Self {
            profiles,
            call_timeout: DEFAULT_RESOLUTION_TIMEOUT,
        }
    }

    /// Bound each backend call by `call_timeout`.
    pub fn with_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Resolve the session held by `sessions` to a validated profile.
    pub async fn resolve_current_profile(
        &self,
        sessions: &dyn SessionStore,
    ) -> Result<UserProfile, ResolutionError> {
        let session = match self.bounded("session lookup", sessions.get_session()).await? {
            Some(session) => session,
            None => {
                debug!("No session");
                return Err(ResolutionError::NotAuthenticated);
            }
        };

        if session.is_expired() {
            debug!(user_id = %session.user_id, "Session expired");
            return Err(ResolutionError::NotAuthenticated);
        }

        let row = self
            .bounded(
                "profile fetch",
                self.profiles.fetch_profile_by_id(&session.access_token, &session.user_id),
            )
            .await?
            .ok_or_else(|| {
                warn!(user_id = %session.user_id, "Session has no profile row");
                ResolutionError::ProfileMissing
            })?;

        let profile = UserProfile::try_from(row).map_err(|e| {
            warn!(user_id = %session.user_id, error = %e, "Profile row rejected");
            ResolutionError::ProfileMissing
        })?;

        if profile.id != session.user_id {
            warn!(
                user_id = %session.user_id,
                profile_id = %profile.id,
                "Profile row does not belong to the session subject"
            );
            return Err(ResolutionError::ProfileMissing);
        }

        debug!(user_id = %profile.id, role = %profile.role, "Profile resolved");
        Ok(profile)
    }

    async fn bounded<T, E, F>(&self, what: &'static str, call: F) -> Result<T, ResolutionError>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match timeout(self.call_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(call = what, error = %e, "Backend call failed during resolution");
                Err(ResolutionError::ProfileMissing)
            }
            Err(_) => {
                warn!(call = what, timeout = ?self.call_timeout, "Backend call timed out during resolution");
                Err(ResolutionError::ProfileMissing)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{memory::MemoryBackend, session::SessionFactory};
    use carebridge_common_core::{ProfileRow, Role};

    fn resolver(backend: &MemoryBackend) -> ProfileResolver {
        ProfileResolver::new(Arc::new(backend.clone()))
    }

    #[tokio::test]
    async fn test_no_session_is_not_authenticated() {
        let backend = MemoryBackend::new();
        let store = backend.open(None);
        assert_eq!(
            resolver(&backend).resolve_current_profile(store.as_ref()).await,
            Err(ResolutionError::NotAuthenticated)
        );
    }

    #[tokio::test]
    async fn test_unknown_token_is_not_authenticated() {
        let backend = MemoryBackend::new();
        let store = backend.open(Some(crate::AccessToken::new("forged")));
        assert_eq!(
            resolver(&backend).resolve_current_profile(store.as_ref()).await,
            Err(ResolutionError::NotAuthenticated)
        );
    }

    #[tokio::test]
    async fn test_resolves_profile() {
        let backend = MemoryBackend::new();
        let id = backend.with_account("cop@precinct.gov", "badge123", "Officer Ade", Role::Police);
        let store = backend.open(Some(backend.issue_session(id)));

        let profile = resolver(&backend).resolve_current_profile(store.as_ref()).await.unwrap();
        assert_eq!(profile.id, id);
        assert_eq!(profile.role, Role::Police);
        assert_eq!(profile.full_name, "Officer Ade");
    }

    #[tokio::test]
    async fn test_missing_row_is_profile_missing() {
        let backend = MemoryBackend::new();
        let id = backend.add_account_without_profile("ghost@x.org", "secret1");
        let store = backend.open(Some(backend.issue_session(id)));

        assert_eq!(
            resolver(&backend).resolve_current_profile(store.as_ref()).await,
            Err(ResolutionError::ProfileMissing)
        );
    }

    #[tokio::test]
    async fn test_unrecognized_role_is_profile_missing() {
        let backend = MemoryBackend::new();
        let id = backend.add_account_without_profile("dr@x.org", "secret1");
        backend.put_profile_row(ProfileRow {
            id: id.to_string(),
            full_name: Some("Dr X".into()),
            email: None,
            phone: None,
            user_type: Some("doctor".into()),
        });
        let store = backend.open(Some(backend.issue_session(id)));

        assert_eq!(
            resolver(&backend).resolve_current_profile(store.as_ref()).await,
            Err(ResolutionError::ProfileMissing)
        );
    }

    #[tokio::test]
    async fn test_null_role_is_profile_missing() {
        let backend = MemoryBackend::new();
        let id = backend.add_account_without_profile("n@x.org", "secret1");
        backend.put_profile_row(ProfileRow {
            id: id.to_string(),
            full_name: None,
            email: None,
            phone: None,
            user_type: None,
        });
        let store = backend.open(Some(backend.issue_session(id)));

        assert_eq!(
            resolver(&backend).resolve_current_profile(store.as_ref()).await,
            Err(ResolutionError::ProfileMissing)
        );
    }

    #[tokio::test]
    async fn test_backend_failure_is_profile_missing() {
        let backend = MemoryBackend::new();
        let id = backend.with_account("p@x.org", "secret1", "P", Role::Patient);
        backend.set_profiles_unavailable(true);
        let store = backend.open(Some(backend.issue_session(id)));

        assert_eq!(
            resolver(&backend).resolve_current_profile(store.as_ref()).await,
            Err(ResolutionError::ProfileMissing)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_profile_fetch_times_out() {
        let backend = MemoryBackend::new();
        let id = backend.with_account("p@x.org", "secret1", "P", Role::Patient);
        backend.set_profile_latency(Some(Duration::from_secs(30)));
        let store = backend.open(Some(backend.issue_session(id)));

        let result = resolver(&backend)
            .with_timeout(Duration::from_millis(250))
            .resolve_current_profile(store.as_ref())
            .await;
        assert_eq!(result, Err(ResolutionError::ProfileMissing));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_profile_fetch_stays_pending_until_deadline() {
        let backend = MemoryBackend::new();
        let id = backend.with_account("p@x.org", "secret1", "P", Role::Patient);
        backend.set_profile_latency(Some(Duration::from_secs(30)));
        let store = backend.open(Some(backend.issue_session(id)));
        let resolver = resolver(&backend).with_timeout(Duration::from_secs(5));

        let mut pass = tokio_test::task::spawn(resolver.resolve_current_profile(store.as_ref()));
        tokio_test::assert_pending!(pass.poll());

        tokio::time::advance(Duration::from_secs(4)).await;
        tokio_test::assert_pending!(pass.poll());

        tokio::time::advance(Duration::from_secs(2)).await;
        let result = tokio_test::assert_ready!(pass.poll());
        assert_eq!(result, Err(ResolutionError::ProfileMissing));
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let backend = MemoryBackend::new();
        let id = backend.with_account("s@x.org", "secret1", "Staff", Role::HospitalStaff);
        let store = backend.open(Some(backend.issue_session(id)));
        let resolver = resolver(&backend);

        let first = resolver.resolve_current_profile(store.as_ref()).await.unwrap();
        let second = resolver.resolve_current_profile(store.as_ref()).await.unwrap();
        assert_eq!(first, second);
    }
}

//! Account registration flows.
//!
//! Both flows create the auth account first and then write the matching
//! `users` row, so the new session resolves to a profile straight away.
//!
//! The two writes are not atomic. If the row insert fails the auth account
//! already exists: the flow ends that session and logs the orphaned account,
//! retries are rejected as duplicates, and sign-ins resolve to a missing
//! profile until the row is written out of band.

use carebridge_common_core::{ProfileRow, Role, UserProfile};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::{AuthError, BackendError},
    session::{ProfileDirectory, Session, SessionFactory, SessionStore, SignUpAttributes},
};

/// Domain of the stand-in emails given to patients imported by national id.
pub const PLACEHOLDER_EMAIL_DOMAIN: &str = "nationaldb.placeholder";

const NATIONAL_ID_LEN: usize = 11;

/// Registration failures.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("national identification number must be 11 digits")]
    InvalidNationalId,

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The auth account exists but has no `users` row.
    #[error("account created but its profile could not be saved: {0}")]
    Profile(#[source] BackendError),
}

/// A national identification number (NIN).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NationalIdentity(String);

impl NationalIdentity {
    pub fn parse(raw: &str) -> Result<Self, RegistrationError> {
        let nin = raw.trim();
        if nin.len() == NATIONAL_ID_LEN && nin.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(nin.to_string()))
        } else {
            Err(RegistrationError::InvalidNationalId)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The stand-in email the imported account is registered under.
    ///
    /// Nobody receives mail here, so these accounts have no password reset
    /// path.
    pub fn placeholder_email(&self) -> String {
        format!("{}@{}", self.0, PLACEHOLDER_EMAIL_DOMAIN)
    }

    /// Whether an email is a national-id stand-in.
    pub fn is_placeholder_email(email: &str) -> bool {
        email
            .rsplit_once('@')
            .is_some_and(|(_, domain)| domain.eq_ignore_ascii_case(PLACEHOLDER_EMAIL_DOMAIN))
    }
}

/// Self-service sign-up. Always creates a patient.
#[derive(Debug, Clone)]
pub struct PatientRegistration {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
}

impl PatientRegistration {
    /// Create the account through `sessions`, leaving it signed in.
    pub async fn register(
        &self,
        sessions: &dyn SessionStore,
        profiles: &dyn ProfileDirectory,
    ) -> Result<Session, RegistrationError> {
        let attributes = SignUpAttributes {
            full_name: self.full_name.clone(),
            phone: self.phone.clone(),
            user_type: Role::Patient,
        };

        let session = sessions.sign_up(&self.email, &self.password, &attributes).await?;

        let row = ProfileRow::new(
            session.user_id,
            self.full_name.clone(),
            Some(self.email.clone()),
            self.phone.clone(),
            Role::Patient,
        );
        if let Err(e) = profiles.insert_profile(&session.access_token, &row).await {
            error!(
                user_id = %session.user_id,
                email = %self.email,
                error = %e,
                "Account created without a profile row"
            );
            end_session(sessions, &session).await;
            return Err(RegistrationError::Profile(e));
        }

        info!(user_id = %session.user_id, "Patient registered");
        Ok(session)
    }
}

/// Import of a patient found in the national database.
#[derive(Debug, Clone)]
pub struct PatientImport {
    pub national_id: NationalIdentity,
    pub full_name: String,
    pub phone: Option<String>,
}

impl PatientImport {
    /// Create the patient's account on a fresh session handle, so the
    /// caller's own session is untouched, and return the new profile.
    pub async fn import(
        &self,
        sessions: &dyn SessionFactory,
        profiles: &dyn ProfileDirectory,
    ) -> Result<UserProfile, RegistrationError> {
        let email = self.national_id.placeholder_email();
        let password = Uuid::new_v4().simple().to_string();
        let attributes = SignUpAttributes {
            full_name: self.full_name.clone(),
            phone: self.phone.clone(),
            user_type: Role::Patient,
        };

        let store = sessions.open(None);
        let session = store.sign_up(&email, &password, &attributes).await?;

        let profile = UserProfile {
            id: session.user_id,
            full_name: self.full_name.clone(),
            email: Some(email),
            phone: self.phone.clone(),
            role: Role::Patient,
        };
        let inserted = profiles
            .insert_profile(&session.access_token, &ProfileRow::from(&profile))
            .await;
        end_session(store.as_ref(), &session).await;

        if let Err(e) = inserted {
            error!(
                user_id = %profile.id,
                national_id = %self.national_id.as_str(),
                error = %e,
                "Imported account created without a profile row"
            );
            return Err(RegistrationError::Profile(e));
        }

        info!(user_id = %profile.id, "Patient imported from national database");
        Ok(profile)
    }
}

async fn end_session(sessions: &dyn SessionStore, session: &Session) {
    if let Err(e) = sessions.sign_out().await {
        warn!(user_id = %session.user_id, error = %e, "Could not end session");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{memory::MemoryBackend, resolver::ProfileResolver};
    use std::sync::Arc;

    #[test]
    fn test_national_id_validation() {
        assert!(NationalIdentity::parse("12345678901").is_ok());
        assert!(NationalIdentity::parse(" 12345678901 ").is_ok());
        assert!(NationalIdentity::parse("1234567890").is_err());
        assert!(NationalIdentity::parse("1234567890a").is_err());
    }

    #[test]
    fn test_placeholder_email() {
        let nin = NationalIdentity::parse("12345678901").unwrap();
        let email = nin.placeholder_email();
        assert_eq!(email, "12345678901@nationaldb.placeholder");
        assert!(NationalIdentity::is_placeholder_email(&email));
        assert!(!NationalIdentity::is_placeholder_email("someone@hospital.org"));
        assert!(!NationalIdentity::is_placeholder_email("no-at-sign"));
    }

    #[tokio::test]
    async fn test_register_creates_resolvable_patient() {
        let backend = MemoryBackend::new();
        let store = backend.open(None);
        let registration = PatientRegistration {
            email: "amaka@x.org".into(),
            password: "secret12".into(),
            full_name: "Amaka Obi".into(),
            phone: Some("+2348000000000".into()),
        };

        registration.register(store.as_ref(), &backend).await.unwrap();

        let profile = ProfileResolver::new(Arc::new(backend.clone()))
            .resolve_current_profile(store.as_ref())
            .await
            .unwrap();
        assert_eq!(profile.role, Role::Patient);
        assert_eq!(profile.full_name, "Amaka Obi");
    }

    #[tokio::test]
    async fn test_import_leaves_no_session_behind() {
        let backend = MemoryBackend::new();
        let import = PatientImport {
            national_id: NationalIdentity::parse("10987654321").unwrap(),
            full_name: "Tunde Bakare".into(),
            phone: None,
        };

        let profile = import.import(&backend, &backend).await.unwrap();
        assert_eq!(profile.email.as_deref(), Some("10987654321@nationaldb.placeholder"));
        assert_eq!(backend.session_count(), 0);

        let token = backend.issue_session(profile.id);
        let row = backend.fetch_profile_by_id(&token, &profile.id).await.unwrap().unwrap();
        assert_eq!(row.user_type.as_deref(), Some("patient"));
    }

    #[tokio::test]
    async fn test_import_twice_is_duplicate() {
        let backend = MemoryBackend::new();
        let import = PatientImport {
            national_id: NationalIdentity::parse("10987654321").unwrap(),
            full_name: "Tunde Bakare".into(),
            phone: None,
        };

        import.import(&backend, &backend).await.unwrap();
        let err = import.import(&backend, &backend).await.unwrap_err();
        assert!(matches!(err, RegistrationError::Auth(ref e) if e.is_duplicate_account()));
    }

    #[tokio::test]
    async fn test_failed_profile_insert_leaves_orphan_account() {
        let backend = MemoryBackend::new();
        backend.set_profiles_unavailable(true);
        let store = backend.open(None);
        let registration = PatientRegistration {
            email: "orphan@x.org".into(),
            password: "secret12".into(),
            full_name: "Orphan".into(),
            phone: None,
        };

        let err = registration.register(store.as_ref(), &backend).await.unwrap_err();
        assert!(matches!(err, RegistrationError::Profile(_)));
        assert_eq!(backend.session_count(), 0);
        assert!(store.get_session().await.unwrap().is_none());

        backend.set_profiles_unavailable(false);
        let retry = registration.register(backend.open(None).as_ref(), &backend).await;
        assert!(matches!(retry, Err(RegistrationError::Auth(ref e)) if e.is_duplicate_account()));
    }

    #[tokio::test]
    async fn test_failed_import_ends_its_session() {
        let backend = MemoryBackend::new();
        backend.set_profiles_unavailable(true);
        let import = PatientImport {
            national_id: NationalIdentity::parse("10987654321").unwrap(),
            full_name: "Tunde Bakare".into(),
            phone: None,
        };

        let err = import.import(&backend, &backend).await.unwrap_err();
        assert!(matches!(err, RegistrationError::Profile(_)));
        assert_eq!(backend.session_count(), 0);
    }
}

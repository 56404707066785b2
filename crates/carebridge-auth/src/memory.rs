//! In-process backend for local development and tests.

use async_trait::async_trait;
use carebridge_common_core::{ProfileRow, Role, UserId};
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::{
    error::{AuthError, BackendError, USER_ALREADY_EXISTS},
    session::{AccessToken, ProfileDirectory, Session, SessionFactory, SessionStore, SignUpAttributes},
};

const SESSION_LIFETIME_SECS: i64 = 3600;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
struct Account {
    id: UserId,
    password: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    accounts: HashMap<String, Account>,
    sessions: HashMap<String, Session>,
    profiles: HashMap<UserId, ProfileRow>,
    profile_latency: Option<Duration>,
    profiles_unavailable: bool,
}

/// Accounts, sessions and profile rows held in memory. Cheap to clone;
/// clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an account together with its profile row.
    pub fn with_account(&self, email: &str, password: &str, full_name: &str, role: Role) -> UserId {
        let id = self.add_account_without_profile(email, password);
        self.put_profile_row(ProfileRow::new(
            id,
            full_name,
            Some(email.to_string()),
            None,
            role,
        ));
        id
    }

    /// Create an account with no row in the `users` table.
    pub fn add_account_without_profile(&self, email: &str, password: &str) -> UserId {
        let id = UserId::new();
        self.state.write().accounts.insert(
            normalize_email(email),
            Account {
                id,
                password: password.to_string(),
            },
        );
        id
    }

    /// Store a raw profile row, valid or not.
    pub fn put_profile_row(&self, row: ProfileRow) {
        match UserId::parse(&row.id) {
            Ok(id) => {
                self.state.write().profiles.insert(id, row);
            }
            Err(_) => {
                tracing::warn!(id = %row.id, "Ignoring profile row with malformed id");
            }
        }
    }

    /// Make every profile fetch wait this long first.
    pub fn set_profile_latency(&self, latency: Option<Duration>) {
        self.state.write().profile_latency = latency;
    }

    /// Make profile fetches fail with a 503.
    pub fn set_profiles_unavailable(&self, unavailable: bool) {
        self.state.write().profiles_unavailable = unavailable;
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.state.read().sessions.len()
    }

    /// Start a session for an existing account, bypassing the password.
    pub fn issue_session(&self, id: UserId) -> AccessToken {
        let email = {
            let state = self.state.read();
            state
                .accounts
                .iter()
                .find(|(_, account)| account.id == id)
                .map(|(email, _)| email.clone())
        };
        self.start_session(id, email).access_token
    }

    /// Force a session to be expired.
    pub fn expire_session(&self, token: &AccessToken) {
        if let Some(session) = self.state.write().sessions.get_mut(token.as_str()) {
            session.expires_at = Some(Utc::now() - ChronoDuration::seconds(1));
        }
    }

    fn start_session(&self, id: UserId, email: Option<String>) -> Session {
        let session = Session {
            access_token: AccessToken::new(Uuid::new_v4().simple().to_string()),
            user_id: id,
            email,
            expires_at: Some(Utc::now() + ChronoDuration::seconds(SESSION_LIFETIME_SECS)),
        };
        self.state
            .write()
            .sessions
            .insert(session.access_token.as_str().to_string(), session.clone());
        session
    }

    /// Table calls need a live session, as they do against the hosted table.
    fn authorize_table_call(&self, token: &AccessToken) -> Result<(), BackendError> {
        match self.lookup(token) {
            Some(_) => Ok(()),
            None => Err(BackendError::Status {
                status: 401,
                body: "invalid or expired access token".into(),
            }),
        }
    }

    fn lookup(&self, token: &AccessToken) -> Option<Session> {
        let state = self.state.read();
        state
            .sessions
            .get(token.as_str())
            .filter(|session| !session.is_expired())
            .cloned()
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl SessionFactory for MemoryBackend {
    fn open(&self, token: Option<AccessToken>) -> Box<dyn SessionStore> {
        Box::new(MemorySession {
            backend: self.clone(),
            token: Mutex::new(token),
        })
    }
}

#[async_trait]
impl ProfileDirectory for MemoryBackend {
    async fn fetch_profile_by_id(
        &self,
        token: &AccessToken,
        id: &UserId,
    ) -> Result<Option<ProfileRow>, BackendError> {
        let latency = self.state.read().profile_latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        self.authorize_table_call(token)?;
        let state = self.state.read();
        if state.profiles_unavailable {
            return Err(BackendError::Status {
                status: 503,
                body: "profiles unavailable".into(),
            });
        }
        Ok(state.profiles.get(id).cloned())
    }

    async fn insert_profile(&self, token: &AccessToken, row: &ProfileRow) -> Result<(), BackendError> {
        self.authorize_table_call(token)?;
        if self.state.read().profiles_unavailable {
            return Err(BackendError::Status {
                status: 503,
                body: "profiles unavailable".into(),
            });
        }
        let id = UserId::parse(&row.id).map_err(|e| BackendError::Status {
            status: 400,
            body: e.to_string(),
        })?;

        let mut state = self.state.write();
        if state.profiles.contains_key(&id) {
            return Err(BackendError::Status {
                status: 409,
                body: "duplicate key value violates unique constraint \"users_pkey\"".into(),
            });
        }
        state.profiles.insert(id, row.clone());
        Ok(())
    }
}

/// A client's view of a [`MemoryBackend`].
pub struct MemorySession {
    backend: MemoryBackend,
    token: Mutex<Option<AccessToken>>,
}

#[async_trait]
impl SessionStore for MemorySession {
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        let token = self.token.lock().clone();
        Ok(token.and_then(|token| self.backend.lookup(&token)))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let account = self
            .backend
            .state
            .read()
            .accounts
            .get(&normalize_email(email))
            .cloned();

        match account {
            Some(account) if account.password == password => {
                let session = self.backend.start_session(account.id, Some(normalize_email(email)));
                *self.token.lock() = Some(session.access_token.clone());
                Ok(session)
            }
            _ => Err(AuthError::rejected(400, "Invalid login credentials")),
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _attributes: &SignUpAttributes,
    ) -> Result<Session, AuthError> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::rejected(
                422,
                format!("Password should be at least {MIN_PASSWORD_LEN} characters."),
            )
            .with_code("weak_password"));
        }

        let key = normalize_email(email);
        let id = {
            let mut state = self.backend.state.write();
            if state.accounts.contains_key(&key) {
                return Err(AuthError::rejected(422, "User already registered")
                    .with_code(USER_ALREADY_EXISTS));
            }
            let id = UserId::new();
            state.accounts.insert(
                key.clone(),
                Account {
                    id,
                    password: password.to_string(),
                },
            );
            id
        };

        let session = self.backend.start_session(id, Some(key));
        *self.token.lock() = Some(session.access_token.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if let Some(token) = self.token.lock().take() {
            self.backend.state.write().sessions.remove(token.as_str());
        }
        Ok(())
    }
}

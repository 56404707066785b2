//! User profile records.

use serde::{Deserialize, Serialize};

use crate::{error::CoreError, id::UserId, role::Role};

/// A row of the hosted `users` table, exactly as the backend returns it.
///
/// Nothing about a row is trusted: the id may be malformed and `user_type`
/// may be absent or outside the role set. Convert with
/// [`UserProfile::try_from`] before making decisions on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub user_type: Option<String>,
}

impl ProfileRow {
    /// Build the row written at registration time.
    pub fn new(
        id: UserId,
        full_name: impl Into<String>,
        email: Option<String>,
        phone: Option<String>,
        role: Role,
    ) -> Self {
        Self {
            id: id.to_string(),
            full_name: Some(full_name.into()),
            email,
            phone,
            user_type: Some(role.as_str().to_string()),
        }
    }
}

/// A validated user profile with a recognized role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(rename = "user_type")]
    pub role: Role,
}

impl UserProfile {
    /// Name to greet the user with, falling back to the email address.
    pub fn display_name(&self) -> &str {
        if !self.full_name.trim().is_empty() {
            &self.full_name
        } else {
            self.email.as_deref().unwrap_or("")
        }
    }
}

impl TryFrom<ProfileRow> for UserProfile {
    type Error = CoreError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let id = UserId::parse(&row.id)?;
        let role = row
            .user_type
            .as_deref()
            .ok_or(CoreError::MissingRole)?
            .parse::<Role>()?;

        Ok(Self {
            id,
            full_name: row.full_name.unwrap_or_default(),
            email: row.email,
            phone: row.phone,
            role,
        })
    }
}

impl From<&UserProfile> for ProfileRow {
    fn from(profile: &UserProfile) -> Self {
        Self::new(
            profile.id,
            profile.full_name.clone(),
            profile.email.clone(),
            profile.phone.clone(),
            profile.role,
        )
    }
}

//! Error types for CareBridge core types.

use thiserror::Error;

use crate::{id::IdParseError, role::RoleParseError};

/// Errors raised while validating raw backend records into domain types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The record id is not a valid user id.
    #[error("invalid user id: {0}")]
    InvalidId(#[from] IdParseError),

    /// The record carries no `user_type`.
    #[error("profile has no user_type")]
    MissingRole,

    /// The record carries a `user_type` outside the closed role set.
    #[error(transparent)]
    UnknownRole(#[from] RoleParseError),
}

/// Result type alias using CareBridge's core error.
pub type Result<T> = std::result::Result<T, CoreError>;

//! The authorization gate.

use carebridge_common_core::{Role, RoleSet, UserId, UserProfile};
use serde::Serialize;
use tracing::info;

use crate::error::ResolutionError;

/// Outcome of checking a resolved profile against a page's roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "decision", content = "role", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    DenyUnauthenticated,
    DenyWrongRole(Role),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Decide whether the resolution result may enter a page admitting `allowed`.
///
/// A resolution error is always `DenyUnauthenticated`, whatever `allowed` is.
pub fn authorize(resolved: &Result<UserProfile, ResolutionError>, allowed: RoleSet) -> Decision {
    match resolved {
        Err(_) => Decision::DenyUnauthenticated,
        Ok(profile) if allowed.contains(profile.role) => Decision::Allow,
        Ok(profile) => Decision::DenyWrongRole(profile.role),
    }
}

/// Emit the structured audit event for a gate decision.
pub fn log_decision(
    page: &str,
    resolved: &Result<UserProfile, ResolutionError>,
    allowed: RoleSet,
    decision: Decision,
) {
    let user_id: Option<UserId> = resolved.as_ref().ok().map(|p| p.id);

    match decision {
        Decision::Allow => info!(
            event = "authz_granted",
            page,
            user_id = ?user_id,
            "Authorization granted"
        ),
        Decision::DenyUnauthenticated => info!(
            event = "authz_denied",
            page,
            reason = ?resolved.as_ref().err(),
            "Authorization denied: not signed in"
        ),
        Decision::DenyWrongRole(role) => info!(
            event = "authz_denied",
            page,
            user_id = ?user_id,
            role = %role,
            allowed = ?allowed,
            "Authorization denied: role not permitted"
        ),
    }
}

//! Test fixtures for CareBridge crates.

use carebridge_common_core::{Role, UserId, UserProfile};

/// A plausible profile carrying `role`, with a fresh id.
pub fn profile_with(role: Role) -> UserProfile {
    UserProfile {
        id: UserId::new(),
        full_name: format!("Test {}", role.label()),
        email: Some(email_for(role)),
        phone: None,
        role,
    }
}

/// Conventional fixture email for a role.
pub fn email_for(role: Role) -> String {
    format!("{}@carebridge.test", role.as_str().replace('_', "."))
}

/// Fixture password shared by seeded accounts.
pub const FIXTURE_PASSWORD: &str = "correct-horse-7";

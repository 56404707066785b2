//! Proptest strategies for core types.

use crate::{Role, RoleSet, UserId, UserProfile};
use proptest::prelude::*;

/// Any role.
pub fn role() -> impl Strategy<Value = Role> {
    prop::sample::select(Role::ALL.to_vec())
}

/// Any subset of roles, including the empty set.
pub fn role_set() -> impl Strategy<Value = RoleSet> {
    prop::collection::vec(role(), 0..=Role::ALL.len())
        .prop_map(|roles| roles.into_iter().collect())
}

/// A profile with a random name and the given role.
pub fn profile_with_role(role: Role) -> impl Strategy<Value = UserProfile> {
    "[A-Z][a-z]{2,10} [A-Z][a-z]{2,12}".prop_map(move |full_name| UserProfile {
        id: UserId::new(),
        email: Some(format!("{}@example.org", full_name.to_lowercase().replace(' ', "."))),
        full_name,
        phone: None,
        role,
    })
}

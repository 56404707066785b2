//! The closed set of application roles.
//!
//! The hosted `users` table stores the role as a free-form `user_type`
//! string. Everything past the profile boundary works with [`Role`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Application role carried by a user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    HospitalStaff,
    Police,
    Admin,
    SuperAdmin,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Role; 5] = [
        Role::Patient,
        Role::HospitalStaff,
        Role::Police,
        Role::Admin,
        Role::SuperAdmin,
    ];

    /// The `user_type` string stored by the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::HospitalStaff => "hospital_staff",
            Self::Police => "police",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// Human-readable label for page headers.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Patient => "Patient",
            Self::HospitalStaff => "Hospital Staff",
            Self::Police => "Police Officer",
            Self::Admin => "Administrator",
            Self::SuperAdmin => "Super Administrator",
        }
    }

    /// Whether the role belongs to the administrator tier.
    pub fn is_administrator(&self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for a `user_type` outside the closed role set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized user_type: {0:?}")]
pub struct RoleParseError(pub String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Self::Patient),
            "hospital_staff" => Ok(Self::HospitalStaff),
            "police" => Ok(Self::Police),
            "admin" => Ok(Self::Admin),
            "super_admin" => Ok(Self::SuperAdmin),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

/// A set of roles, used to express which roles may enter a page.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    /// No role at all.
    pub const EMPTY: RoleSet = RoleSet(0);

    /// The administrator tier: `admin` and `super_admin`.
    pub const ADMINISTRATORS: RoleSet = RoleSet::of(&[Role::Admin, Role::SuperAdmin]);

    /// Every role.
    pub const ALL: RoleSet = RoleSet::of(&Role::ALL);

    /// Build a set from a list of roles.
    pub const fn of(roles: &[Role]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < roles.len() {
            bits |= roles[i].bit();
            i += 1;
        }
        Self(bits)
    }

    /// A set holding one role.
    pub const fn single(role: Role) -> Self {
        Self(role.bit())
    }

    /// Return a copy with `role` added.
    pub const fn with(self, role: Role) -> Self {
        Self(self.0 | role.bit())
    }

    /// Return the union of two sets.
    pub const fn union(self, other: RoleSet) -> Self {
        Self(self.0 | other.0)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate the roles in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(|role| self.contains(*role))
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, RoleSet::with)
    }
}

impl From<Role> for RoleSet {
    fn from(role: Role) -> Self {
        Self::single(role)
    }
}

impl fmt::Debug for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

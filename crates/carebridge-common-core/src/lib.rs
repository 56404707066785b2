//! CareBridge common core types.
//!
//! Identity and profile types shared by the auth core and the HTTP server.

pub mod error;
pub mod id;
pub mod profile;
pub mod role;

#[cfg(feature = "proptest")]
pub mod strategies;

pub use error::{CoreError, Result};
pub use id::{IdParseError, UserId};
pub use profile::{ProfileRow, UserProfile};
pub use role::{Role, RoleParseError, RoleSet};

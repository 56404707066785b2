//! Access core for CareBridge.
//!
//! Every protected page runs the same sequence: look up the session, resolve
//! the profile behind it, decide whether the profile's role may enter, and
//! either render or redirect. The pieces are:
//!
//! - [`SessionStore`], [`SessionFactory`] and [`ProfileDirectory`]: the
//!   hosted backend, as injected collaborators.
//! - [`ProfileResolver`]: session to validated [`UserProfile`].
//! - [`authorize`]: the pure allow/deny decision.
//! - [`RoleRouter`]: landing routes, guard-mode and post-login redirects.
//! - [`PageGuard`]: the composite state machine a page shell runs.
//!
//! Two backends ship with the crate: [`HostedBackend`] talks to the hosted
//! auth and table APIs over HTTP, [`MemoryBackend`] keeps everything in
//! process for local runs and tests.

#![warn(clippy::all)]

pub mod error;
pub mod gate;
pub mod guard;
pub mod hosted;
pub mod memory;
pub mod registration;
pub mod resolver;
pub mod router;
pub mod session;

pub use carebridge_common_core::{ProfileRow, Role, RoleSet, UserId, UserProfile};
pub use error::{AuthError, BackendError, ResolutionError, USER_ALREADY_EXISTS};
pub use gate::{authorize, log_decision, Decision};
pub use guard::{DenyReason, GuardEvent, GuardOutcome, GuardState, PageGuard};
pub use hosted::{HostedBackend, HostedConfig};
pub use memory::MemoryBackend;
pub use registration::{
    NationalIdentity, PatientImport, PatientRegistration, RegistrationError, PLACEHOLDER_EMAIL_DOMAIN,
};
pub use resolver::ProfileResolver;
pub use router::{AdminLanding, Navigation, Notice, RoleRouter, RoutePath};
pub use session::{
    AccessToken, ProfileDirectory, Session, SessionFactory, SessionStore, SignUpAttributes,
};

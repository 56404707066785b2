//! Middleware for the CareBridge HTTP server.

pub mod guard;
pub mod token;

pub use guard::{CurrentProfile, GuardLayer, GuardMiddleware};
pub use token::extract_token;

//! Error handling for the CareBridge HTTP server.

pub mod response;
pub mod types;

pub use types::{ApiError, ApiResult};

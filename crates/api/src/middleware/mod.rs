//! Request middleware.

pub mod auth;
pub mod capability;

pub use auth::{AuthUser, auth_middleware};
pub use capability::require_capability;

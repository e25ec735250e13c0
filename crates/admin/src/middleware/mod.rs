//! HTTP middleware.
//!
//! - `session` - cookie sessions (tower-sessions)
//! - `auth` - extractors guarding the admin routes

pub mod auth;
pub mod session;

pub use auth::{AdminAuthRejection, OptionalAdminAuth, RequireAdminAuth};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};

//! Session-stored admin identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vitrina_core::Email;

/// Minimal data stored in the cookie session once the gate authorizes a sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Admin's email address.
    pub email: Email,
    /// When this browser session signed in.
    pub signed_in_at: DateTime<Utc>,
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";
}

//! Identity gate errors.

use thiserror::Error;

/// Why the gate refused or ended a session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The provider rejected the credentials; carries its message.
    #[error("{0}")]
    InvalidCredentials(String),

    /// The account's email address has not been confirmed.
    #[error("email address has not been confirmed")]
    EmailUnconfirmed,

    /// Valid account, but not the store admin.
    #[error("this account is not allowed to manage the store")]
    Forbidden,

    /// No authorized session is active.
    #[error("no active admin session")]
    MissingIdentity,

    /// The provider failed to end the session. Local state is cleared anyway.
    #[error("sign-out failed: {0}")]
    SignOut(String),
}

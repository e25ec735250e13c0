//! Backend-as-a-service collaborators.
//!
//! Everything the storefront persists or authenticates goes through three
//! narrow contracts:
//!
//! - [`IdentityProvider`] - credential exchange, session restore, sign-out and
//!   push notifications when the session changes
//! - [`RecordStore`] - CRUD over the `store_config` and `products` collections
//! - [`AssetStore`] - binary uploads with public URLs
//!
//! Two adapters implement all three:
//!
//! - [`RestBackend`] - the hosted service over HTTPS
//! - [`MemoryBackend`] - in-process, with call recording and fault injection

pub mod memory;
pub mod rest;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

pub use memory::{BackendCall, FailPoint, MemoryBackend};
pub use rest::RestBackend;

/// Errors returned by record and asset stores.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The request never produced a response (DNS, TLS, timeout...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message extracted from the response body.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode backend response: {0}")]
    Decode(String),

    /// The addressed record does not exist.
    #[error("record not found")]
    NotFound,

    /// The service is unavailable (used by the in-memory adapter).
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Error reported by the identity provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
    /// Human-readable message, surfaced to the admin on failed sign-in.
    pub message: String,
    /// Machine-readable code, when the provider sends one.
    pub code: Option<String>,
}

impl ProviderError {
    /// Error code the provider uses for unconfirmed accounts.
    pub const EMAIL_NOT_CONFIRMED: &'static str = "email_not_confirmed";

    /// Create an error with a message and no code.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Create an error with a message and a code.
    #[must_use]
    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// Whether the provider refused the credentials because the email is unconfirmed.
    #[must_use]
    pub fn is_email_unconfirmed(&self) -> bool {
        self.code.as_deref() == Some(Self::EMAIL_NOT_CONFIRMED)
            || self.message == "Email not confirmed"
    }
}

/// The identity attached to a provider session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Email the account was registered with.
    pub email: String,
    /// When the email was confirmed; `None` while unconfirmed.
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

/// What changed in a session notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventKind {
    /// A session was established.
    SignedIn,
    /// The session ended, possibly from another client.
    SignedOut,
    /// The access token was renewed.
    TokenRefreshed,
    /// The account behind the session changed.
    UserUpdated,
}

/// Asynchronous session-change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    /// What happened.
    pub kind: SessionEventKind,
    /// The identity attached to the session after the change.
    pub identity: Option<Identity>,
}

/// Identity provider contract.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange email and password for a session.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, ProviderError>;

    /// Identity of the current session, if any.
    async fn current_session(&self) -> Result<Option<Identity>, ProviderError>;

    /// End the current session.
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Receive session-change notifications.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}

/// Named record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Singleton store configuration.
    StoreConfig,
    /// Catalog products.
    Products,
}

impl Collection {
    /// Table name in the record store.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::StoreConfig => "store_config",
            Self::Products => "products",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// Sort direction for [`RecordQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// Filter for [`RecordStore::select`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    /// Column to sort by and direction.
    pub order_by: Option<(String, Order)>,
    /// Maximum number of rows.
    pub limit: Option<usize>,
}

impl RecordQuery {
    /// Every row, unordered.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Sort by `column`, largest first.
    #[must_use]
    pub fn order_desc(mut self, column: &str) -> Self {
        self.order_by = Some((column.to_owned(), Order::Descending));
        self
    }

    /// Sort by `column`, smallest first.
    #[must_use]
    pub fn order_asc(mut self, column: &str) -> Self {
        self.order_by = Some((column.to_owned(), Order::Ascending));
        self
    }

    /// Return at most `limit` rows.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Record store contract.
///
/// Rows travel as JSON objects keyed by column name; the catalog service
/// owns the typed mapping.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch rows.
    async fn select(
        &self,
        collection: Collection,
        query: RecordQuery,
    ) -> Result<Vec<Value>, BackendError>;

    /// Insert a row and return it as stored (with server-assigned columns).
    async fn insert(&self, collection: Collection, row: Value) -> Result<Value, BackendError>;

    /// Apply `patch` to the row with `id` and return the updated row.
    async fn update(
        &self,
        collection: Collection,
        id: i64,
        patch: Value,
    ) -> Result<Value, BackendError>;

    /// Delete the row with `id`.
    async fn delete(&self, collection: Collection, id: i64) -> Result<(), BackendError>;
}

/// Asset store contract.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store `bytes` under `path`.
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BackendError>;

    /// Public URL of the object at `path`.
    fn public_url(&self, path: &str) -> String;

    /// Delete the objects at `paths`.
    async fn remove(&self, paths: &[String]) -> Result<(), BackendError>;
}

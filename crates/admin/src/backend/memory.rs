//! In-process backend.
//!
//! Implements all three collaborator contracts on plain collections. Used by
//! the test suites, by `vitrina --memory` and for local demos without a hosted
//! backend. Every call is recorded, and any operation can be made to fail.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use super::{
    AssetStore, BackendError, Collection, Identity, IdentityProvider, Order, ProviderError,
    RecordQuery, RecordStore, SessionEvent, SessionEventKind,
};

/// Base of the public URLs handed out for stored assets.
const PUBLIC_ASSET_BASE: &str = "https://assets.local";

/// Capacity of the session event channel.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// A call made against the in-memory backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// `sign_in_with_password`
    SignIn {
        /// Email the caller tried.
        email: String,
    },
    /// `current_session`
    CurrentSession,
    /// `sign_out`
    SignOut,
    /// `select`
    Select(Collection),
    /// `insert`
    Insert(Collection),
    /// `update`
    Update(Collection, i64),
    /// `delete`
    Delete(Collection, i64),
    /// `upload`
    Upload(String),
    /// `remove`
    Remove(Vec<String>),
}

impl BackendCall {
    /// Whether this call touched the asset store.
    #[must_use]
    pub const fn is_asset_call(&self) -> bool {
        matches!(self, Self::Upload(_) | Self::Remove(_))
    }

    /// Whether this call touched the record store.
    #[must_use]
    pub const fn is_record_call(&self) -> bool {
        matches!(
            self,
            Self::Select(_) | Self::Insert(_) | Self::Update(..) | Self::Delete(..)
        )
    }
}

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    SignIn,
    CurrentSession,
    SignOut,
    Select,
    Insert,
    Update,
    Delete,
    Upload,
    Remove,
}

#[derive(Debug, Clone)]
struct MemoryUser {
    password: String,
    email_confirmed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct StoredAsset {
    bytes: Vec<u8>,
    content_type: String,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<String, MemoryUser>,
    require_confirmation: bool,
    session: Option<Identity>,
    tables: HashMap<Collection, Vec<Value>>,
    next_id: i64,
    last_timestamp: Option<DateTime<Utc>>,
    assets: BTreeMap<String, StoredAsset>,
    calls: Vec<BackendCall>,
    failures: HashSet<FailPoint>,
}

impl State {
    /// Current time, strictly later than any timestamp handed out before.
    fn tick(&mut self) -> String {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp
            && now <= last
        {
            now = last + Duration::microseconds(1);
        }
        self.last_timestamp = Some(now);
        now.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn check(&self, point: FailPoint) -> Result<(), BackendError> {
        if self.failures.contains(&point) {
            return Err(BackendError::Unavailable(format!("{point:?} failure injected")));
        }
        Ok(())
    }

    fn insert_row(&mut self, collection: Collection, row: Value) -> Result<Value, BackendError> {
        let Value::Object(mut fields) = row else {
            return Err(BackendError::Decode("row must be a JSON object".to_string()));
        };

        self.next_id += 1;
        let now = self.tick();
        fields.insert("id".to_string(), Value::from(self.next_id));
        fields
            .entry("created_at")
            .or_insert_with(|| Value::String(now.clone()));
        fields
            .entry("updated_at")
            .or_insert_with(|| Value::String(now));

        let row = Value::Object(fields);
        self.tables.entry(collection).or_default().push(row.clone());
        Ok(row)
    }
}

/// In-memory implementation of [`IdentityProvider`], [`RecordStore`] and [`AssetStore`].
#[derive(Debug)]
pub struct MemoryBackend {
    bucket: String,
    state: Mutex<State>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new("product-images")
    }
}

impl MemoryBackend {
    /// Create an empty backend whose assets live in `bucket`.
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            bucket: bucket.into(),
            state: Mutex::new(State::default()),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Setup
    // =========================================================================

    /// Register an account. `confirmed` sets the confirmation timestamp.
    #[must_use]
    pub fn with_user(self, email: &str, password: &str, confirmed: bool) -> Self {
        self.lock().users.insert(
            email.to_string(),
            MemoryUser {
                password: password.to_string(),
                email_confirmed_at: confirmed.then(Utc::now),
            },
        );
        self
    }

    /// Refuse password sign-in for unconfirmed accounts, as the hosted
    /// service does when email confirmation is enabled.
    #[must_use]
    pub fn with_confirmation_required(self) -> Self {
        self.lock().require_confirmation = true;
        self
    }

    /// Start with an existing session, as if restored from a previous visit.
    #[must_use]
    pub fn with_session(self, identity: Identity) -> Self {
        self.lock().session = Some(identity);
        self
    }

    /// Insert a row directly, bypassing the call log and fault injection.
    ///
    /// Returns the stored row with its assigned `id`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Decode`] if `row` is not a JSON object.
    pub fn seed_row(&self, collection: Collection, row: Value) -> Result<Value, BackendError> {
        self.lock().insert_row(collection, row)
    }

    /// Store an asset directly, bypassing the call log. Returns its public URL.
    pub fn seed_asset(&self, path: &str, bytes: Vec<u8>) -> String {
        self.lock().assets.insert(
            path.to_string(),
            StoredAsset {
                bytes,
                content_type: "application/octet-stream".to_string(),
            },
        );
        self.public_url(path)
    }

    // =========================================================================
    // Fault injection and notifications
    // =========================================================================

    /// Make `point` fail (or succeed again) until changed.
    pub fn set_failure(&self, point: FailPoint, failing: bool) {
        let mut state = self.lock();
        if failing {
            state.failures.insert(point);
        } else {
            state.failures.remove(&point);
        }
    }

    /// Replace the session and push a notification, as another client or a
    /// token refresh would.
    pub fn emit(&self, kind: SessionEventKind, identity: Option<Identity>) {
        self.lock().session.clone_from(&identity);
        // No receivers is not an error: nobody is listening yet.
        let _ = self.events.send(SessionEvent { kind, identity });
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Identity of the current session.
    #[must_use]
    pub fn session(&self) -> Option<Identity> {
        self.lock().session.clone()
    }

    /// Rows of `collection` in insertion order.
    #[must_use]
    pub fn rows(&self, collection: Collection) -> Vec<Value> {
        self.lock()
            .tables
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Paths of all stored assets, sorted.
    #[must_use]
    pub fn asset_paths(&self) -> Vec<String> {
        self.lock().assets.keys().cloned().collect()
    }

    /// Content type and size of a stored asset.
    #[must_use]
    pub fn asset(&self, path: &str) -> Option<(String, usize)> {
        self.lock()
            .assets
            .get(path)
            .map(|asset| (asset.content_type.clone(), asset.bytes.len()))
    }
}

#[async_trait]
impl IdentityProvider for MemoryBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, ProviderError> {
        let identity = {
            let mut state = self.lock();
            state.calls.push(BackendCall::SignIn {
                email: email.to_string(),
            });
            state
                .check(FailPoint::SignIn)
                .map_err(|e| ProviderError::new(e.to_string()))?;

            let user = state
                .users
                .get(email)
                .filter(|user| user.password == password)
                .cloned()
                .ok_or_else(|| {
                    ProviderError::with_code("Invalid login credentials", "invalid_credentials")
                })?;

            if state.require_confirmation && user.email_confirmed_at.is_none() {
                return Err(ProviderError::with_code(
                    "Email not confirmed",
                    ProviderError::EMAIL_NOT_CONFIRMED,
                ));
            }

            let identity = Identity {
                email: email.to_string(),
                email_confirmed_at: user.email_confirmed_at,
            };
            state.session = Some(identity.clone());
            identity
        };

        let _ = self.events.send(SessionEvent {
            kind: SessionEventKind::SignedIn,
            identity: Some(identity.clone()),
        });
        Ok(identity)
    }

    async fn current_session(&self) -> Result<Option<Identity>, ProviderError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::CurrentSession);
        state
            .check(FailPoint::CurrentSession)
            .map_err(|e| ProviderError::new(e.to_string()))?;
        Ok(state.session.clone())
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        {
            let mut state = self.lock();
            state.calls.push(BackendCall::SignOut);
            state
                .check(FailPoint::SignOut)
                .map_err(|e| ProviderError::new(e.to_string()))?;
            state.session = None;
        }

        let _ = self.events.send(SessionEvent {
            kind: SessionEventKind::SignedOut,
            identity: None,
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl RecordStore for MemoryBackend {
    async fn select(
        &self,
        collection: Collection,
        query: RecordQuery,
    ) -> Result<Vec<Value>, BackendError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::Select(collection));
        state.check(FailPoint::Select)?;

        let mut rows = state.tables.get(&collection).cloned().unwrap_or_default();
        if let Some((column, order)) = &query.order_by {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(column), b.get(column));
                match order {
                    Order::Ascending => ordering,
                    Order::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, collection: Collection, row: Value) -> Result<Value, BackendError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::Insert(collection));
        state.check(FailPoint::Insert)?;
        state.insert_row(collection, row)
    }

    async fn update(
        &self,
        collection: Collection,
        id: i64,
        patch: Value,
    ) -> Result<Value, BackendError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::Update(collection, id));
        state.check(FailPoint::Update)?;

        let Value::Object(patch) = patch else {
            return Err(BackendError::Decode("patch must be a JSON object".to_string()));
        };

        let row = state
            .tables
            .get_mut(&collection)
            .and_then(|rows| rows.iter_mut().find(|row| row_id(row) == Some(id)))
            .ok_or(BackendError::NotFound)?;

        if let Value::Object(fields) = row {
            merge(fields, patch);
        }
        Ok(row.clone())
    }

    async fn delete(&self, collection: Collection, id: i64) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::Delete(collection, id));
        state.check(FailPoint::Delete)?;

        let rows = state.tables.entry(collection).or_default();
        let before = rows.len();
        rows.retain(|row| row_id(row) != Some(id));
        if rows.len() == before {
            return Err(BackendError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl AssetStore for MemoryBackend {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::Upload(path.to_string()));
        state.check(FailPoint::Upload)?;

        if state.assets.contains_key(path) {
            return Err(BackendError::Status {
                status: 409,
                message: "The resource already exists".to_string(),
            });
        }
        state.assets.insert(
            path.to_string(),
            StoredAsset {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{PUBLIC_ASSET_BASE}/{}/{path}", self.bucket)
    }

    async fn remove(&self, paths: &[String]) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::Remove(paths.to_vec()));
        state.check(FailPoint::Remove)?;

        for path in paths {
            state.assets.remove(path);
        }
        Ok(())
    }
}

fn row_id(row: &Value) -> Option<i64> {
    row.get("id").and_then(Value::as_i64)
}

fn merge(fields: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        fields.insert(key, value);
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Null) | None, Some(Value::Null) | None) => Ordering::Equal,
        (Some(Value::Null) | None, Some(_)) => Ordering::Less,
        (Some(_), Some(Value::Null) | None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

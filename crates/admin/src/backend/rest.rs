//! Hosted backend-as-a-service client.
//!
//! Talks to the service's REST endpoints directly with reqwest:
//!
//! - records under `/rest/v1/{table}`
//! - assets under `/storage/v1/object/{bucket}`
//! - identity under `/auth/v1`
//!
//! Every request carries the project `apikey` header and a bearer token: the
//! session access token once signed in, the anon key otherwise.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, instrument, warn};
use url::Url;

use super::{
    AssetStore, BackendError, Collection, Identity, IdentityProvider, Order, ProviderError,
    RecordQuery, RecordStore, SessionEvent, SessionEventKind,
};
use crate::config::BackendConfig;

/// Capacity of the session event channel.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Tokens of the signed-in session.
struct SessionTokens {
    access_token: SecretString,
    refresh_token: SecretString,
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    user: UserResponse,
}

/// User object returned by the identity endpoints.
#[derive(Debug, Deserialize)]
struct UserResponse {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_confirmed_at: Option<DateTime<Utc>>,
}

impl UserResponse {
    fn into_identity(self) -> Identity {
        Identity {
            email: self.email.unwrap_or_default(),
            email_confirmed_at: self.email_confirmed_at,
        }
    }
}

/// Client for the hosted backend. Implements all three collaborator traits.
pub struct RestBackend {
    client: Client,
    base_url: Url,
    anon_key: SecretString,
    bucket: String,
    session: RwLock<Option<SessionTokens>>,
    events: broadcast::Sender<SessionEvent>,
}

impl std::fmt::Debug for RestBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestBackend")
            .field("base_url", &self.base_url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl RestBackend {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            client,
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
            bucket: config.asset_bucket.clone(),
            session: RwLock::new(None),
            events,
        })
    }

    /// Build an endpoint URL from path segments and query parameters.
    fn endpoint(&self, segments: &[&str], params: &[(&str, String)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            for segment in segments {
                // Asset paths contain slashes; keep them as separate segments.
                path.extend(segment.split('/'));
            }
        }
        if !params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        url
    }

    /// Attach the `apikey` header and the bearer token.
    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let session = self.session.read().await;
        let bearer = session.as_ref().map_or_else(
            || self.anon_key.expose_secret().to_owned(),
            |tokens| tokens.access_token.expose_secret().to_owned(),
        );
        request
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(bearer)
    }

    /// Send a request and turn non-success statuses into [`BackendError::Status`].
    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = self
            .authorized(request)
            .await
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let (message, _) = error_details(response).await;
        warn!(status = %status, message = %message, "Backend request failed");
        Err(BackendError::Status {
            status: status.as_u16(),
            message,
        })
    }

    /// Decode a JSON array of rows.
    async fn rows(response: Response) -> Result<Vec<Value>, BackendError> {
        response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    /// Exchange a grant at the token endpoint.
    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<TokenResponse, ProviderError> {
        let url = self.endpoint(
            &["auth", "v1", "token"],
            &[("grant_type", grant_type.to_string())],
        );
        let response = self
            .client
            .post(url)
            .header("apikey", self.anon_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::new(e.to_string()))?;

        if !response.status().is_success() {
            let (message, code) = error_details(response).await;
            return Err(ProviderError { message, code });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::new(format!("invalid token response: {e}")))
    }

    async fn store_tokens(&self, tokens: TokenResponse) -> Identity {
        let identity = tokens.user.into_identity();
        *self.session.write().await = Some(SessionTokens {
            access_token: SecretString::from(tokens.access_token),
            refresh_token: SecretString::from(tokens.refresh_token),
        });
        identity
    }

    fn publish(&self, kind: SessionEventKind, identity: Option<Identity>) {
        // No receivers is not an error.
        let _ = self.events.send(SessionEvent { kind, identity });
    }

    /// Renew the access token with the stored refresh token.
    ///
    /// Publishes [`SessionEventKind::TokenRefreshed`] on success. When the
    /// service rejects the refresh token the local session is dropped and
    /// [`SessionEventKind::SignedOut`] is published instead.
    ///
    /// Returns `Ok(None)` when there is no session to refresh.
    ///
    /// # Errors
    ///
    /// Returns the provider error if the refresh fails.
    #[instrument(skip(self))]
    pub async fn refresh_session(&self) -> Result<Option<Identity>, ProviderError> {
        let refresh_token = {
            let session = self.session.read().await;
            match session.as_ref() {
                Some(tokens) => tokens.refresh_token.expose_secret().to_owned(),
                None => return Ok(None),
            }
        };

        match self
            .token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
        {
            Ok(tokens) => {
                let identity = self.store_tokens(tokens).await;
                debug!("Session token refreshed");
                self.publish(SessionEventKind::TokenRefreshed, Some(identity.clone()));
                Ok(Some(identity))
            }
            Err(e) => {
                if e.code.is_some() {
                    warn!(error = %e, "Refresh token rejected, dropping session");
                    *self.session.write().await = None;
                    self.publish(SessionEventKind::SignedOut, None);
                }
                Err(e)
            }
        }
    }
}

/// Extract a message and code from an error response body.
///
/// The identity, record and storage services each shape errors differently;
/// this looks for the common fields in order.
async fn error_details(response: Response) -> (String, Option<String>) {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    let field = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_owned);

    let message = field("msg")
        .or_else(|| field("error_description"))
        .or_else(|| field("message"))
        .or_else(|| field("error"))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });
    let code = field("error_code").or_else(|| field("error"));

    (message, code)
}

#[async_trait]
impl IdentityProvider for RestBackend {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, ProviderError> {
        let tokens = self
            .token_grant("password", json!({ "email": email, "password": password }))
            .await?;
        let identity = self.store_tokens(tokens).await;
        debug!("Signed in");
        self.publish(SessionEventKind::SignedIn, Some(identity.clone()));
        Ok(identity)
    }

    #[instrument(skip(self))]
    async fn current_session(&self) -> Result<Option<Identity>, ProviderError> {
        if self.session.read().await.is_none() {
            return Ok(None);
        }

        let request = self.client.get(self.endpoint(&["auth", "v1", "user"], &[]));
        let response = self
            .authorized(request)
            .await
            .send()
            .await
            .map_err(|e| ProviderError::new(e.to_string()))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Stored session is no longer valid");
            *self.session.write().await = None;
            return Ok(None);
        }
        if !response.status().is_success() {
            let (message, code) = error_details(response).await;
            return Err(ProviderError { message, code });
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::new(format!("invalid user response: {e}")))?;
        Ok(Some(user.into_identity()))
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), ProviderError> {
        let had_session = self.session.read().await.is_some();
        let result = if had_session {
            let request = self.client.post(self.endpoint(&["auth", "v1", "logout"], &[]));
            match self.authorized(request).await.send().await {
                Ok(response) if response.status().is_success() => Ok(()),
                Ok(response) => {
                    let (message, code) = error_details(response).await;
                    Err(ProviderError { message, code })
                }
                Err(e) => Err(ProviderError::new(e.to_string())),
            }
        } else {
            Ok(())
        };

        // The local session ends whatever the service answered.
        *self.session.write().await = None;
        self.publish(SessionEventKind::SignedOut, None);
        result
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl RecordStore for RestBackend {
    #[instrument(skip(self, query), fields(collection = %collection))]
    async fn select(
        &self,
        collection: Collection,
        query: RecordQuery,
    ) -> Result<Vec<Value>, BackendError> {
        let mut params = vec![("select", "*".to_string())];
        if let Some((column, order)) = &query.order_by {
            let direction = match order {
                Order::Ascending => "asc",
                Order::Descending => "desc",
            };
            params.push(("order", format!("{column}.{direction}")));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }

        let url = self.endpoint(&["rest", "v1", collection.table()], &params);
        let response = self.send(self.client.get(url)).await?;
        let rows = Self::rows(response).await?;
        debug!(count = rows.len(), "Selected rows");
        Ok(rows)
    }

    #[instrument(skip(self, row), fields(collection = %collection))]
    async fn insert(&self, collection: Collection, row: Value) -> Result<Value, BackendError> {
        let url = self.endpoint(&["rest", "v1", collection.table()], &[]);
        let request = self
            .client
            .post(url)
            .header("Prefer", "return=representation")
            .json(&row);
        let response = self.send(request).await?;
        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode("insert returned no representation".to_string()))
    }

    #[instrument(skip(self, patch), fields(collection = %collection, id = id))]
    async fn update(
        &self,
        collection: Collection,
        id: i64,
        patch: Value,
    ) -> Result<Value, BackendError> {
        let url = self.endpoint(
            &["rest", "v1", collection.table()],
            &[("id", format!("eq.{id}"))],
        );
        let request = self
            .client
            .patch(url)
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = self.send(request).await?;
        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or(BackendError::NotFound)
    }

    #[instrument(skip(self), fields(collection = %collection, id = id))]
    async fn delete(&self, collection: Collection, id: i64) -> Result<(), BackendError> {
        let url = self.endpoint(
            &["rest", "v1", collection.table()],
            &[("id", format!("eq.{id}"))],
        );
        let request = self
            .client
            .delete(url)
            .header("Prefer", "return=representation");
        let response = self.send(request).await?;
        if Self::rows(response).await?.is_empty() {
            return Err(BackendError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl AssetStore for RestBackend {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BackendError> {
        let content_type = HeaderValue::from_str(content_type)
            .map_err(|e| BackendError::Transport(format!("invalid content type: {e}")))?;
        let url = self.endpoint(&["storage", "v1", "object", &self.bucket, path], &[]);
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes);
        self.send(request).await?;
        debug!("Asset uploaded");
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        self.endpoint(
            &["storage", "v1", "object", "public", &self.bucket, path],
            &[],
        )
        .to_string()
    }

    #[instrument(skip(self))]
    async fn remove(&self, paths: &[String]) -> Result<(), BackendError> {
        let url = self.endpoint(&["storage", "v1", "object", &self.bucket], &[]);
        let request = self.client.delete(url).json(&json!({ "prefixes": paths }));
        self.send(request).await?;
        debug!(count = paths.len(), "Assets removed");
        Ok(())
    }
}

//! Identity gate.
//!
//! Restricts the admin surface to a single configured email address. Credential
//! checks are delegated to the [`IdentityProvider`]; the gate applies two more
//! rules on top of every identity it sees:
//!
//! 1. the email must be confirmed
//! 2. the email must equal the configured admin email exactly
//!
//! A session failing either rule is signed out on the spot, whether it came
//! from a sign-in, a restored session or a provider notification.
//!
//! The gate's state is published on a [`watch`] channel:
//!
//! ```text
//! Unknown -> Checking -> Unauthorized | Authorized
//! ```

mod error;

pub use error::AuthError;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use vitrina_core::Email;

use crate::backend::{Identity, IdentityProvider, ProviderError, SessionEvent};

/// An identity seen by the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminSession {
    /// Email of the signed-in account.
    pub email: String,
    /// When the email was confirmed.
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

impl AdminSession {
    /// Whether the provider has verified the email address.
    #[must_use]
    pub const fn email_verified(&self) -> bool {
        self.email_confirmed_at.is_some()
    }

    /// Whether the account is confirmed.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        self.email_confirmed_at.is_some()
    }

    /// Whether this session may administer the store owned by `admin`.
    #[must_use]
    pub fn is_authorized_for(&self, admin: &Email) -> bool {
        self.is_confirmed() && admin.matches(&self.email)
    }
}

impl From<Identity> for AdminSession {
    fn from(identity: Identity) -> Self {
        Self {
            email: identity.email,
            email_confirmed_at: identity.email_confirmed_at,
        }
    }
}

/// Authorization state of the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "session", rename_all = "snake_case")]
pub enum GateState {
    /// Nothing checked yet.
    Unknown,
    /// A check against the provider is in flight.
    Checking,
    /// No authorized session.
    Unauthorized,
    /// The admin is signed in.
    Authorized(AdminSession),
}

impl GateState {
    /// The single "is the admin signed in" flag.
    #[must_use]
    pub const fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized(_))
    }
}

struct GateInner {
    provider: Arc<dyn IdentityProvider>,
    admin_email: Email,
    state: watch::Sender<GateState>,
}

/// Gate in front of the admin surface. Cheap to clone.
#[derive(Clone)]
pub struct IdentityGate {
    inner: Arc<GateInner>,
}

impl std::fmt::Debug for IdentityGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityGate")
            .field("admin_email", &self.inner.admin_email)
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl IdentityGate {
    /// Create a gate admitting only `admin_email`.
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, admin_email: Email) -> Self {
        let (state, _) = watch::channel(GateState::Unknown);
        Self {
            inner: Arc::new(GateInner {
                provider,
                admin_email,
                state,
            }),
        }
    }

    /// The configured admin email.
    #[must_use]
    pub fn admin_email(&self) -> &Email {
        &self.inner.admin_email
    }

    /// Latest gate state.
    #[must_use]
    pub fn state(&self) -> GateState {
        self.inner.state.borrow().clone()
    }

    /// Whether the admin is currently signed in.
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        self.inner.state.borrow().is_authorized()
    }

    /// Watch gate state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<GateState> {
        self.inner.state.subscribe()
    }

    /// The authorized session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingIdentity`] unless the gate is authorized.
    pub fn require_admin(&self) -> Result<AdminSession, AuthError> {
        match &*self.inner.state.borrow() {
            GateState::Authorized(session) => Ok(session.clone()),
            _ => Err(AuthError::MissingIdentity),
        }
    }

    fn set_state(&self, state: GateState) {
        self.inner.state.send_replace(state);
    }

    /// Apply the confirmation and admin-email rules.
    fn authorize(&self, identity: Identity) -> Result<AdminSession, AuthError> {
        let session = AdminSession::from(identity);
        if !session.is_confirmed() {
            return Err(AuthError::EmailUnconfirmed);
        }
        if !self.inner.admin_email.matches(&session.email) {
            return Err(AuthError::Forbidden);
        }
        Ok(session)
    }

    /// Sign out a session the gate refused. Failures are logged only.
    async fn force_sign_out(&self, reason: &AuthError) {
        warn!(reason = %reason, "Refusing session, signing it out");
        if let Err(e) = self.inner.provider.sign_out().await {
            warn!(error = %e, "Forced sign-out failed");
        }
    }

    /// Check an identity and settle the gate state accordingly.
    async fn settle(&self, identity: Identity) -> Result<AdminSession, AuthError> {
        match self.authorize(identity) {
            Ok(session) => {
                self.set_state(GateState::Authorized(session.clone()));
                Ok(session)
            }
            Err(e) => {
                self.force_sign_out(&e).await;
                self.set_state(GateState::Unauthorized);
                Err(e)
            }
        }
    }

    /// Map a provider refusal to the error shown to the caller.
    fn refusal(error: ProviderError) -> AuthError {
        if error.is_email_unconfirmed() {
            AuthError::EmailUnconfirmed
        } else {
            AuthError::InvalidCredentials(error.message)
        }
    }

    /// Sign in with email and password.
    ///
    /// While the admin is already signed in, an attempt only changes the gate
    /// if it signs the admin in again: other accounts are refused without
    /// reaching the provider, and a failed admin attempt leaves the current
    /// session as it is.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidCredentials`] with the provider's message
    /// - [`AuthError::EmailUnconfirmed`] when the provider or the gate finds the
    ///   email unconfirmed
    /// - [`AuthError::Forbidden`] for any account other than the admin
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AdminSession, AuthError> {
        if self.is_authorized() {
            return self.sign_in_again(email, password).await;
        }

        self.set_state(GateState::Checking);

        let identity = match self.inner.provider.sign_in_with_password(email, password).await {
            Ok(identity) => identity,
            Err(e) => {
                self.set_state(GateState::Unauthorized);
                debug!(error = %e, "Provider rejected sign-in");
                return Err(Self::refusal(e));
            }
        };

        let session = self.settle(identity).await?;
        info!("Admin signed in");
        Ok(session)
    }

    /// Sign-in attempt while the admin session is active.
    async fn sign_in_again(&self, email: &str, password: &str) -> Result<AdminSession, AuthError> {
        if !self.inner.admin_email.matches(email) {
            debug!("Refusing another account while the admin is signed in");
            return Err(AuthError::Forbidden);
        }

        let identity = self
            .inner
            .provider
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| {
                debug!(error = %e, "Provider rejected admin sign-in, keeping current session");
                Self::refusal(e)
            })?;

        let session = self.settle(identity).await?;
        info!("Admin signed in again");
        Ok(session)
    }

    /// End the session.
    ///
    /// Local state becomes [`GateState::Unauthorized`] whatever the provider
    /// answers.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SignOut`] if the provider call failed.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let result = self.inner.provider.sign_out().await;
        self.set_state(GateState::Unauthorized);

        match result {
            Ok(()) => {
                info!("Admin signed out");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Remote sign-out failed, local session cleared");
                Err(AuthError::SignOut(e.message))
            }
        }
    }

    /// Restore the session from the provider.
    ///
    /// A session belonging to any other identity, or to an unconfirmed admin,
    /// is signed out as a side effect.
    #[instrument(skip(self))]
    pub async fn current_session(&self) -> Option<AdminSession> {
        self.set_state(GateState::Checking);

        match self.inner.provider.current_session().await {
            Ok(Some(identity)) => self.settle(identity).await.ok(),
            Ok(None) => {
                self.set_state(GateState::Unauthorized);
                None
            }
            Err(e) => {
                warn!(error = %e, "Could not restore session");
                self.set_state(GateState::Unauthorized);
                None
            }
        }
    }

    /// Re-apply the rules to a provider notification.
    #[instrument(skip(self, event), fields(kind = ?event.kind))]
    pub async fn handle_event(&self, event: SessionEvent) {
        match event.identity {
            None => {
                debug!("Session ended");
                self.set_state(GateState::Unauthorized);
            }
            Some(identity) => {
                self.set_state(GateState::Checking);
                let _ = self.settle(identity).await;
            }
        }
    }

    /// Start following provider notifications in the background.
    ///
    /// The subscription is taken before this returns, so no notification
    /// published afterwards is missed.
    #[must_use]
    pub fn spawn_session_listener(&self) -> SessionListener {
        let mut events = self.inner.provider.subscribe();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let gate = self.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    received = events.recv() => match received {
                        Ok(event) => gate.handle_event(event).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Session listener lagged, re-checking session");
                            let _ = gate.current_session().await;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            debug!("Session listener stopped");
        });

        SessionListener {
            shutdown: Some(shutdown_tx),
            handle,
        }
    }
}

/// Handle to the background session subscription.
#[derive(Debug)]
pub struct SessionListener {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl SessionListener {
    /// Stop listening and wait for the task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            warn!(error = %e, "Session listener task failed");
        }
    }

    /// Whether the listener has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

//! Admin sign-in and sign-out.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{debug, warn};

use vitrina_core::Email;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::extract::JsonBody;
use crate::middleware::OptionalAdminAuth;
use crate::models::{CurrentAdmin, session_keys};
use crate::services::{AuthError, GateState};
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/session", get(session_status))
}

/// Sign-in form.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Current authentication status.
#[derive(Debug, Serialize)]
pub struct SessionStatus {
    /// This browser holds an authorized admin session.
    pub signed_in: bool,
    /// Gate state.
    pub gate: GateState,
}

/// Result of a sign-out.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub signed_out: bool,
    /// Set when the identity provider could not end its session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Sign in through the identity gate.
///
/// # Errors
///
/// Returns 401 for bad credentials or an unconfirmed email, 403 for any
/// account other than the admin.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    JsonBody(form): JsonBody<LoginRequest>,
) -> Result<Json<SessionStatus>, AppError> {
    let admin = state.gate().sign_in(form.email.trim(), &form.password).await?;
    let email = Email::parse(&admin.email).map_err(|_| AuthError::Forbidden)?;

    // New session id on privilege change
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    session
        .insert(
            session_keys::CURRENT_ADMIN,
            CurrentAdmin {
                email,
                signed_in_at: Utc::now(),
            },
        )
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;

    set_sentry_user(&admin.email);

    Ok(Json(SessionStatus {
        signed_in: true,
        gate: state.gate().state(),
    }))
}

/// Sign out. The browser session is cleared even if the provider call fails.
///
/// Only a browser holding the authorized admin session ends the provider
/// session; any other caller just has its own cookie session cleared.
///
/// # Errors
///
/// Returns 500 if the session store fails.
pub async fn logout(
    State(state): State<AppState>,
    OptionalAdminAuth(admin): OptionalAdminAuth,
    session: Session,
) -> Result<Json<LogoutResponse>, AppError> {
    let holds_gate_session = admin.is_some_and(|admin| {
        state
            .gate()
            .require_admin()
            .is_ok_and(|current| admin.email.matches(&current.email))
    });

    let warning = if holds_gate_session {
        match state.gate().sign_out().await {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "Sign-out incomplete");
                Some(e.to_string())
            }
        }
    } else {
        debug!("No admin session in this browser, clearing cookie session only");
        None
    };

    session
        .flush()
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    clear_sentry_user();

    Ok(Json(LogoutResponse {
        signed_out: true,
        warning,
    }))
}

/// Report whether this browser is signed in, and the gate state.
pub async fn session_status(
    State(state): State<AppState>,
    OptionalAdminAuth(admin): OptionalAdminAuth,
) -> Json<SessionStatus> {
    let gate = state.gate().state();
    let signed_in = match (&admin, &gate) {
        (Some(admin), GateState::Authorized(session)) => admin.email.matches(&session.email),
        _ => false,
    };
    Json(SessionStatus { signed_in, gate })
}

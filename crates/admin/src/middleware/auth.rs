//! Authentication extractors.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;
use tracing::debug;

use crate::models::{CurrentAdmin, session_keys};
use crate::state::AppState;

/// Extractor that requires an authorized admin.
///
/// Both must hold:
///
/// - the cookie session carries a [`CurrentAdmin`]
/// - the identity gate is authorized for that same email
///
/// A cookie outliving the gate's authorization (sign-out elsewhere, session
/// revoked by the provider) is cleared on the way.
///
/// ```rust,ignore
/// async fn protected_handler(RequireAdminAuth(admin): RequireAdminAuth) -> impl IntoResponse {
///     format!("Hello, {}!", admin.email)
/// }
/// ```
pub struct RequireAdminAuth(pub CurrentAdmin);

/// Error returned when admin authentication is required but missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAuthRejection {
    /// No session layer is installed.
    MissingSession,
    /// Not signed in, or no longer authorized.
    Unauthorized,
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::MissingSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "admin sign-in required" })),
            )
                .into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireAdminAuth {
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AdminAuthRejection::MissingSession)?;

        let admin: CurrentAdmin = session
            .get(session_keys::CURRENT_ADMIN)
            .await
            .ok()
            .flatten()
            .ok_or(AdminAuthRejection::Unauthorized)?;

        let authorized = state
            .gate()
            .require_admin()
            .is_ok_and(|gate_session| admin.email.matches(&gate_session.email));

        if !authorized {
            debug!(email = %admin.email, "Session admin is no longer authorized");
            let _ = session
                .remove::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
                .await;
            return Err(AdminAuthRejection::Unauthorized);
        }

        Ok(Self(admin))
    }
}

/// Extractor that optionally gets the current admin.
///
/// Only reads the cookie session; never rejects.
pub struct OptionalAdminAuth(pub Option<CurrentAdmin>);

impl<S> FromRequestParts<S> for OptionalAdminAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admin = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(admin))
    }
}

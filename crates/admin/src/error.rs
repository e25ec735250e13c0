//! Unified error handling for the HTTP surface.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::{AuthError, CatalogError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Catalog operation failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Identity gate refused the request.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Catalog(CatalogError::Validation(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Catalog(CatalogError::ConfigRequired) => StatusCode::CONFLICT,
            Self::Catalog(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Catalog(_) | Self::Auth(AuthError::SignOut(_)) => StatusCode::BAD_GATEWAY,
            Self::Auth(AuthError::Forbidden) => StatusCode::FORBIDDEN,
            Self::Auth(_) | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the failure is on our side (or a collaborator's) rather than the client's.
    fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Catalog(CatalogError::Upload(_)) => "Image upload failed".to_string(),
            Self::Catalog(e) if !e.is_not_found() && status == StatusCode::BAD_GATEWAY => {
                "Saving to the store backend failed".to_string()
            }
            _ => self.to_string(),
        };

        let body = match &self {
            Self::Catalog(CatalogError::Validation(e)) => {
                json!({ "error": message, "field": e.field() })
            }
            _ => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Set the Sentry user context for the signed-in admin.
pub fn set_sentry_user(email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::services::ValidationError;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 9".to_string());
        assert_eq!(err.to_string(), "Not found: product 9");

        let err = AppError::Catalog(CatalogError::ConfigRequired);
        assert_eq!(
            err.to_string(),
            "save the store configuration before adding products"
        );
    }

    #[test]
    fn test_catalog_status_codes() {
        assert_eq!(
            get_status(CatalogError::Validation(ValidationError::Required("name")).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CatalogError::ConfigRequired.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(CatalogError::Record(BackendError::NotFound).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(CatalogError::Upload(BackendError::Transport("down".into())).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(CatalogError::Record(BackendError::Decode("bad".into())).into()),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_auth_status_codes() {
        assert_eq!(
            get_status(AuthError::InvalidCredentials("nope".into()).into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AuthError::EmailUnconfirmed.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AuthError::Forbidden.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AuthError::MissingIdentity.into()),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_internal_is_500() {
        assert_eq!(
            get_status(AppError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

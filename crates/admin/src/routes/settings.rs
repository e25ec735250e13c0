//! Store configuration.

use axum::{Json, Router, extract::State, routing::get};

use crate::error::AppError;
use crate::extract::JsonBody;
use crate::middleware::RequireAdminAuth;
use crate::models::{StoreConfig, StoreConfigInput};
use crate::state::AppState;

/// Build the store configuration router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/admin/store-config", get(show).put(save))
}

/// Cached configuration (the fallback, with `id: null`, until first saved).
pub async fn show(_admin: RequireAdminAuth, State(state): State<AppState>) -> Json<StoreConfig> {
    Json(state.catalog().config().await)
}

/// Save the configuration.
///
/// # Errors
///
/// Returns 400 for invalid input and 502 when the backend fails.
pub async fn save(
    _admin: RequireAdminAuth,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<StoreConfigInput>,
) -> Result<Json<StoreConfig>, AppError> {
    Ok(Json(state.catalog().update_store_config(input).await?))
}

//! Product management.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};

use vitrina_core::ProductId;

use crate::error::AppError;
use crate::extract::JsonBody;
use crate::middleware::RequireAdminAuth;
use crate::models::{Product, ProductInput};
use crate::state::AppState;

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/products", get(list).post(create))
        .route(
            "/api/admin/products/{id}",
            get(show).put(update).delete(destroy),
        )
}

/// Cached products, newest first.
pub async fn list(_admin: RequireAdminAuth, State(state): State<AppState>) -> Json<Vec<Product>> {
    Json(state.catalog().products().await)
}

/// One cached product.
///
/// # Errors
///
/// Returns 404 if the product is not in the catalog.
pub async fn show(
    _admin: RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, AppError> {
    state
        .catalog()
        .product(id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// Add a product.
///
/// # Errors
///
/// Returns 400 for invalid input, 409 while no store configuration is saved
/// and 502 when the backend fails.
pub async fn create(
    _admin: RequireAdminAuth,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<ProductInput>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let product = state.catalog().add_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Update a product.
///
/// # Errors
///
/// Returns 400 for invalid input, 404 for an unknown id and 502 when the
/// backend fails.
pub async fn update(
    _admin: RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    JsonBody(input): JsonBody<ProductInput>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.catalog().update_product(id, input).await?))
}

/// Delete a product.
///
/// # Errors
///
/// Returns 404 for an unknown id and 502 when the backend fails.
pub async fn destroy(
    _admin: RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, AppError> {
    state.catalog().delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

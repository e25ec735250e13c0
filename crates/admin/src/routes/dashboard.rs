//! Dashboard overview and catalog reload.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Serialize;

use crate::middleware::RequireAdminAuth;
use crate::models::{Product, StoreConfig};
use crate::services::{CatalogSnapshot, DashboardStats};
use crate::state::AppState;

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/dashboard", get(dashboard))
        .route("/api/admin/refresh", post(refresh))
}

/// Dashboard data.
#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub store: StoreConfig,
    /// Whether products can be added yet.
    pub store_configured: bool,
    pub products: Vec<Product>,
}

/// Summary figures, configuration and products.
pub async fn dashboard(_admin: RequireAdminAuth, State(state): State<AppState>) -> Json<Dashboard> {
    let snapshot = state.catalog().snapshot().await;
    Json(Dashboard {
        stats: DashboardStats::from_products(&snapshot.products),
        store_configured: snapshot.config.exists(),
        store: snapshot.config,
        products: snapshot.products,
    })
}

/// Reload configuration and products from the record store.
pub async fn refresh(
    _admin: RequireAdminAuth,
    State(state): State<AppState>,
) -> Json<CatalogSnapshot> {
    Json(state.catalog().refresh().await)
}

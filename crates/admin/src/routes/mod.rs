//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Health check
//!
//! # Public
//! GET    /api/storefront?q=&category= - Store details and listed products
//!
//! # Auth
//! POST   /api/auth/login              - Sign in (admin email only)
//! POST   /api/auth/logout             - Sign out
//! GET    /api/auth/session            - Current sign-in status
//!
//! # Admin (requires an authorized admin session)
//! GET    /api/admin/dashboard         - Stats, configuration and products
//! POST   /api/admin/refresh           - Reload the catalog from the record store
//! GET    /api/admin/products          - Product list
//! POST   /api/admin/products          - Add a product
//! GET    /api/admin/products/{id}     - Product detail
//! PUT    /api/admin/products/{id}     - Update a product
//! DELETE /api/admin/products/{id}     - Delete a product
//! GET    /api/admin/store-config      - Store configuration
//! PUT    /api/admin/store-config      - Save the store configuration
//! ```

use axum::{Router, extract::DefaultBodyLimit};

use crate::state::AppState;

pub mod auth;
pub mod dashboard;
pub mod products;
pub mod settings;
pub mod storefront;

/// Request body limit for admin writes. Images travel base64-encoded in JSON.
pub const ADMIN_BODY_LIMIT: usize = 8 * 1024 * 1024;

/// Build the API router.
pub fn routes() -> Router<AppState> {
    let admin = Router::new()
        .merge(dashboard::router())
        .merge(products::router())
        .merge(settings::router())
        .layer(DefaultBodyLimit::max(ADMIN_BODY_LIMIT));

    Router::new()
        .merge(storefront::router())
        .merge(auth::router())
        .merge(admin)
}

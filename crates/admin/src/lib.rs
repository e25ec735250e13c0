//! Vitrina storefront service.
//!
//! A small-store catalog backed by a hosted backend-as-a-service:
//!
//! - a public storefront listing products with WhatsApp contact links
//! - an identity gate that admits exactly one configured admin account
//! - a catalog state manager owning the store configuration and products,
//!   keeping the record store, the asset store and the local cache in step
//!
//! The backend is reached through the traits in [`backend`], so the services
//! run the same against [`backend::RestBackend`] and the in-process
//! [`backend::MemoryBackend`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, routing::get};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use middleware::create_session_layer;
use state::AppState;

/// Build the full application router with session and trace layers.
///
/// Sentry layers are left to the binary so tests can drive the router without
/// a Sentry hub.
pub fn build_app(state: AppState, secure_cookies: bool) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .layer(create_session_layer(secure_cookies))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the backend.
async fn health() -> &'static str {
    "ok"
}

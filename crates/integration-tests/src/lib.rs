//! Integration tests for Vitrina.
//!
//! Everything runs in-process against [`MemoryBackend`], so no hosted
//! backend or network access is needed:
//!
//! ```bash
//! cargo test -p vitrina-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `identity_gate` - Admin-only sign-in, session restore and notifications
//! - `catalog` - Catalog state manager properties and failure handling
//! - `scenarios` - End-to-end catalog walkthroughs
//! - `http_api` - The axum router, cookies included

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use vitrina_admin::backend::{Collection, Identity, MemoryBackend};
use vitrina_admin::models::{ImageUpload, ProductInput};
use vitrina_admin::services::{CatalogService, IdentityGate};
use vitrina_admin::state::AppState;
use vitrina_core::Email;

/// The configured admin account.
pub const ADMIN_EMAIL: &str = "owner@casaluna.shop";

/// Password of every registered test account.
pub const PASSWORD: &str = "s3cret-Passw0rd";

/// A confirmed account that is not the admin.
pub const STRANGER_EMAIL: &str = "visitor@casaluna.shop";

/// The admin email as configured.
#[must_use]
pub fn admin_email() -> Email {
    Email::parse(ADMIN_EMAIL).expect("valid admin email")
}

/// Backend with a confirmed admin and a confirmed stranger.
#[must_use]
pub fn backend() -> Arc<MemoryBackend> {
    Arc::new(
        MemoryBackend::default()
            .with_user(ADMIN_EMAIL, PASSWORD, true)
            .with_user(STRANGER_EMAIL, PASSWORD, true),
    )
}

/// Identity gate over `backend`.
#[must_use]
pub fn gate(backend: &Arc<MemoryBackend>) -> IdentityGate {
    IdentityGate::new(backend.clone(), admin_email())
}

/// Catalog service over `backend`.
#[must_use]
pub fn catalog(backend: &Arc<MemoryBackend>) -> CatalogService {
    CatalogService::new(backend.clone(), backend.clone())
}

/// Application state over `backend`.
#[must_use]
pub fn app_state(backend: &Arc<MemoryBackend>) -> AppState {
    AppState::from_backend(backend.clone(), admin_email())
}

/// An identity as the provider would report it.
#[must_use]
pub fn identity(email: &str, confirmed: bool) -> Identity {
    Identity {
        email: email.to_string(),
        email_confirmed_at: confirmed.then(Utc::now),
    }
}

/// Store a configuration row and return its id.
pub fn seed_config(backend: &MemoryBackend) -> i64 {
    let row = backend
        .seed_row(
            Collection::StoreConfig,
            json!({
                "name": "Casa Luna",
                "email": "hola@casaluna.shop",
                "phone": "+34 600 000 000",
                "whatsapp": "+34600000000",
                "instagram": "casaluna",
            }),
        )
        .expect("seed store config");
    row_id(&row)
}

/// Store a product row and return its id.
pub fn seed_product(backend: &MemoryBackend, fields: Value) -> i64 {
    let row = backend
        .seed_row(Collection::Products, fields)
        .expect("seed product");
    row_id(&row)
}

fn row_id(row: &Value) -> i64 {
    row.get("id").and_then(Value::as_i64).expect("row id")
}

/// Product input with no image.
#[must_use]
pub fn product_input(name: &str, category: &str, price: Decimal) -> ProductInput {
    ProductInput {
        name: name.to_string(),
        category: category.to_string(),
        price: price.into(),
        ..ProductInput::default()
    }
}

/// Bytes of a tiny image.
pub const IMAGE_BYTES: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// A PNG read from disk.
#[must_use]
pub fn png_file() -> ImageUpload {
    ImageUpload::File {
        file_name: "chair.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: IMAGE_BYTES.to_vec(),
    }
}

/// The same PNG as a data URL, as a browser form sends it.
#[must_use]
pub fn png_data_url() -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(IMAGE_BYTES))
}

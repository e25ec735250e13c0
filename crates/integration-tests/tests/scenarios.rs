//! End-to-end catalog walkthroughs over the in-memory backend.

use rust_decimal::Decimal;
use serde_json::json;

use vitrina_admin::backend::{BackendCall, Collection, FailPoint};
use vitrina_admin::models::{ProductInput, StoreConfig};
use vitrina_admin::services::{CatalogError, ValidationError};
use vitrina_core::{PhoneError, ProductId, ProductStatus};
use vitrina_integration_tests::{
    backend, catalog, png_file, product_input, seed_config, seed_product,
};

// =============================================================================
// First run: no store configuration yet
// =============================================================================

#[tokio::test]
async fn test_empty_store_config_falls_back_and_blocks_products() {
    let backend = backend();
    let catalog = catalog(&backend);

    let config = catalog.load_config().await;
    assert_eq!(config, StoreConfig::fallback());
    assert_eq!(config.id, None);

    let err = catalog
        .add_product(product_input("X", "Y", Decimal::from(10)))
        .await
        .unwrap_err();
    assert_eq!(err, CatalogError::ConfigRequired);
    assert!(backend.rows(Collection::Products).is_empty());
}

// =============================================================================
// Adding a product without an image
// =============================================================================

#[tokio::test]
async fn test_add_product_without_image_appears_first() {
    let backend = backend();
    let config_id = seed_config(&backend);
    seed_product(
        &backend,
        json!({"name": "Table", "category": "Furniture", "price": 90, "store_config_id": config_id}),
    );
    let catalog = catalog(&backend);
    catalog.refresh().await;
    assert_eq!(catalog.config().await.id.map(|id| id.as_i64()), Some(config_id));

    let chair = catalog
        .add_product(ProductInput {
            status: ProductStatus::Available,
            ..product_input("Chair", "Furniture", Decimal::new(4999, 2))
        })
        .await
        .unwrap();

    // Stored with an empty image URL, read back as no image
    let row = backend
        .rows(Collection::Products)
        .into_iter()
        .find(|row| row["id"] == json!(chair.id.as_i64()))
        .unwrap();
    assert_eq!(row["image_url"], json!(""));
    assert_eq!(row["store_config_id"], json!(config_id));
    assert_eq!(chair.image_url, None);

    // First in the cache and in a fresh load
    assert_eq!(catalog.products().await.first(), Some(&chair));
    let loaded = catalog.load_products().await;
    assert_eq!(loaded.first().map(|p| p.name.as_str()), Some("Chair"));
    assert_eq!(loaded.first().map(|p| p.price.amount()), Some(Decimal::new(4999, 2)));
    assert_eq!(loaded.len(), 2);
}

// =============================================================================
// Replacing a product image
// =============================================================================

#[tokio::test]
async fn test_replace_image_uploads_then_removes_then_updates() {
    let backend = backend();
    let config_id = seed_config(&backend);
    backend.seed_asset("public/a.png", vec![1, 2, 3]);
    let id = seed_product(
        &backend,
        json!({
            "name": "Chair",
            "category": "Furniture",
            "price": 49.99,
            "image_url": "https://host/a.png",
            "store_config_id": config_id,
        }),
    );
    let catalog = catalog(&backend);
    catalog.refresh().await;
    backend.clear_calls();

    let current = catalog.product(ProductId::new(id)).await.unwrap();
    let updated = catalog
        .update_product(
            current.id,
            ProductInput {
                image: Some(png_file()),
                ..ProductInput::from_product(&current)
            },
        )
        .await
        .unwrap();

    let calls = backend.calls();
    assert_eq!(calls.len(), 3, "{calls:?}");
    let Some(BackendCall::Upload(new_path)) = calls.first() else {
        panic!("expected an upload first, got {calls:?}");
    };
    assert_eq!(
        calls.get(1),
        Some(&BackendCall::Remove(vec!["public/a.png".to_string()]))
    );
    assert_eq!(
        calls.get(2),
        Some(&BackendCall::Update(Collection::Products, id))
    );

    let expected_url = format!("https://assets.local/product-images/{new_path}");
    assert_eq!(updated.image_url.as_deref(), Some(expected_url.as_str()));
    assert_eq!(
        catalog.product(current.id).await.unwrap().image_url,
        updated.image_url
    );
    assert_eq!(backend.asset_paths(), [new_path.clone()]);
}

// =============================================================================
// Deleting a product whose image cannot be removed
// =============================================================================

#[tokio::test]
async fn test_delete_succeeds_when_image_removal_fails() {
    let backend = backend();
    let config_id = seed_config(&backend);
    let url = backend.seed_asset("public/lamp.png", vec![1, 2, 3]);
    let id = seed_product(
        &backend,
        json!({"name": "Lamp", "category": "Lighting", "price": 20, "image_url": url, "store_config_id": config_id}),
    );
    let catalog = catalog(&backend);
    catalog.refresh().await;
    backend.clear_calls();
    backend.set_failure(FailPoint::Remove, true);

    catalog.delete_product(ProductId::new(id)).await.unwrap();

    assert_eq!(
        backend.calls(),
        vec![
            BackendCall::Delete(Collection::Products, id),
            BackendCall::Remove(vec!["public/lamp.png".to_string()]),
        ]
    );
    assert!(catalog.products().await.is_empty());
    assert!(backend.rows(Collection::Products).is_empty());
    // The image stays behind
    assert_eq!(backend.asset_paths(), ["public/lamp.png"]);
}

#[tokio::test]
async fn test_delete_removes_image() {
    let backend = backend();
    let config_id = seed_config(&backend);
    let url = backend.seed_asset("public/lamp.png", vec![1, 2, 3]);
    let id = seed_product(
        &backend,
        json!({"name": "Lamp", "category": "Lighting", "price": 20, "image_url": url, "store_config_id": config_id}),
    );
    let catalog = catalog(&backend);
    catalog.refresh().await;

    catalog.delete_product(ProductId::new(id)).await.unwrap();

    assert!(backend.asset_paths().is_empty());
}

// =============================================================================
// WhatsApp override pattern
// =============================================================================

#[tokio::test]
async fn test_whatsapp_override_pattern() {
    let backend = backend();
    seed_config(&backend);
    let catalog = catalog(&backend);
    catalog.refresh().await;

    let accepted = catalog
        .add_product(ProductInput {
            whatsapp: Some("12345".to_string()),
            ..product_input("Chair", "Furniture", Decimal::from(10))
        })
        .await
        .unwrap();
    assert_eq!(accepted.whatsapp.as_deref(), Some("12345"));

    backend.clear_calls();
    let err = catalog
        .add_product(ProductInput {
            whatsapp: Some("0123".to_string()),
            ..product_input("Desk", "Furniture", Decimal::from(10))
        })
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CatalogError::Validation(ValidationError::Whatsapp(PhoneError::LeadingZero))
    );
    assert!(backend.calls().is_empty());
}

//! Seed the store from a catalog file.
//!
//! The file holds an optional `store` section (the settings form) and a list
//! of `products`. Image fields are paths relative to the file:
//!
//! ```yaml
//! store:
//!   name: Casa Verde
//!   email: hola@casaverde.shop
//!   phone: "+34 600 000 000"
//!   whatsapp: "+34600000000"
//!   instagram: casaverde
//!   banner_image: images/banner.jpg
//! products:
//!   - name: Chair
//!     category: Furniture
//!     price: 49.99
//!     image: images/chair.png
//! ```
//!
//! Products whose name already exists in the catalog are skipped.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use vitrina_admin::models::{ImageUpload, ProductInput, SocialLinks, StoreConfigInput};
use vitrina_core::ProductStatus;

/// Parsed catalog file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub store: Option<StoreEntry>,
    #[serde(default)]
    pub products: Vec<ProductEntry>,
}

/// `store` section.
#[derive(Debug, Deserialize)]
pub struct StoreEntry {
    pub name: String,
    #[serde(default)]
    pub slogan: String,
    #[serde(default)]
    pub store_description: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub whatsapp: Option<String>,
    #[serde(flatten)]
    pub social_links: SocialLinks,
    #[serde(default)]
    pub schedule: String,
    #[serde(default)]
    pub banner_image: Option<PathBuf>,
}

/// One entry of `products`.
#[derive(Debug, Deserialize)]
pub struct ProductEntry {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub whatsapp: Option<String>,
    #[serde(default)]
    pub image: Option<PathBuf>,
}

/// Seed configuration and products from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, an image is
/// missing, sign-in fails, or the store configuration cannot be saved.
/// Individual product failures are reported and counted.
pub async fn catalog(file_path: &Path, memory: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !file_path.exists() {
        return Err(format!("File not found: {}", file_path.display()).into());
    }

    info!(path = %file_path.display(), "Loading catalog from file");

    // Read and resolve everything before touching the backend
    let content = tokio::fs::read_to_string(file_path).await?;
    let file: CatalogFile = serde_yaml::from_str(&content)?;
    let base_dir = file_path.parent().unwrap_or_else(|| Path::new("."));

    let store = match file.store {
        Some(entry) => Some(store_input(entry, base_dir).await?),
        None => None,
    };
    let mut products = Vec::with_capacity(file.products.len());
    for entry in file.products {
        products.push(product_input(entry, base_dir).await?);
    }

    info!(
        store = store.is_some(),
        products = products.len(),
        "Parsed catalog"
    );

    let state = super::connect(memory)?;
    super::sign_in_admin(&state, memory).await?;
    let snapshot = state.catalog().refresh().await;

    if let Some(input) = store {
        let saved = state.catalog().update_store_config(input).await?;
        info!(store = %saved.name, "Store configuration saved");
    }

    let mut existing: HashSet<String> = snapshot.products.into_iter().map(|p| p.name).collect();
    let mut inserted = 0usize;
    let mut skipped = 0usize;
    let mut failed = Vec::new();

    for input in products {
        if existing.contains(&input.name) {
            skipped += 1;
            continue;
        }
        let name = input.name.clone();
        match state.catalog().add_product(input).await {
            Ok(product) => {
                info!(id = %product.id, name = %product.name, "Product added");
                existing.insert(name);
                inserted += 1;
            }
            Err(e) => failed.push((name, e)),
        }
    }

    if let Err(e) = state.gate().sign_out().await {
        error!(error = %e, "Sign-out failed");
    }

    info!("Seeding complete!");
    info!("  Products inserted: {inserted}");
    info!("  Products skipped (already exist): {skipped}");

    if !failed.is_empty() {
        error!("  Errors: {}", failed.len());
        for (name, err) in &failed {
            error!("    - {name}: {err}");
        }
        return Err(format!("{} products failed", failed.len()).into());
    }

    Ok(())
}

async fn store_input(
    entry: StoreEntry,
    base_dir: &Path,
) -> Result<StoreConfigInput, Box<dyn std::error::Error>> {
    let banner_image = match entry.banner_image {
        Some(path) => Some(read_image(&base_dir.join(path)).await?),
        None => None,
    };
    Ok(StoreConfigInput {
        name: entry.name,
        slogan: entry.slogan,
        store_description: entry.store_description,
        email: entry.email,
        phone: entry.phone,
        whatsapp: entry.whatsapp,
        social_links: entry.social_links,
        schedule: entry.schedule,
        banner_image,
    })
}

async fn product_input(
    entry: ProductEntry,
    base_dir: &Path,
) -> Result<ProductInput, Box<dyn std::error::Error>> {
    let image = match entry.image {
        Some(path) => Some(read_image(&base_dir.join(path)).await?),
        None => None,
    };
    Ok(ProductInput {
        name: entry.name,
        category: entry.category,
        description: entry.description,
        price: entry.price.into(),
        status: entry.status,
        whatsapp: entry.whatsapp,
        image,
    })
}

async fn read_image(path: &Path) -> Result<ImageUpload, Box<dyn std::error::Error>> {
    let content_type = content_type_for(path)
        .ok_or_else(|| format!("Unsupported image type: {}", path.display()))?;
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| format!("Cannot read {}: {e}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(ImageUpload::File {
        file_name,
        content_type: content_type.to_string(),
        bytes,
    })
}

/// Image MIME type from a file extension.
fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "avif" => Some("image/avif"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

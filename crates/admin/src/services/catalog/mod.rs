//! Catalog state manager.
//!
//! Holds the cached store configuration and product list and routes every
//! mutation through the record and asset stores. Mutations touching an image
//! run asset operations first and the record write second:
//!
//! ```text
//! validate -> upload new image -> remove replaced image -> write record -> update cache
//! ```
//!
//! There is no transaction across the two stores. A record write failing
//! after a successful upload leaves the uploaded asset orphaned, and an old
//! image removed before a failed record write stays removed. Cleanup of
//! replaced or deleted images is best effort and only logged when it fails.
//!
//! The cache is only touched after the remote calls of an operation succeed,
//! so a failed operation never leaves partial state behind. Concurrent
//! mutations are not serialized: the last response to arrive wins.

mod error;

pub use error::{CatalogError, ValidationError};

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use vitrina_core::{Email, Price, ProductId, ProductStatus, WhatsappNumber};

use crate::backend::{AssetStore, BackendError, Collection, RecordQuery, RecordStore};
use crate::models::{
    DecodedImage, Product, ProductInput, ProductWrite, StoreConfig, StoreConfigInput,
    StoreConfigWrite,
};

/// Length of the random part of generated asset names.
const ASSET_SUFFIX_LEN: usize = 8;

/// Folder all assets are stored under.
const ASSET_FOLDER: &str = "public";

/// Cached catalog state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSnapshot {
    /// Store configuration, or the fallback while none is saved.
    pub config: StoreConfig,
    /// Products, newest first.
    pub products: Vec<Product>,
}

/// What an uploaded image is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetKind {
    Product,
    Banner,
}

/// Generate a fresh asset path.
///
/// `public/{millis}_{suffix}.{ext}` for products,
/// `public/banner_{millis}_{suffix}.{ext}` for banners.
fn asset_path(kind: AssetKind, extension: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ASSET_SUFFIX_LEN)
        .map(char::from)
        .collect();
    let prefix = match kind {
        AssetKind::Product => "",
        AssetKind::Banner => "banner_",
    };
    format!("{ASSET_FOLDER}/{prefix}{millis}_{suffix}.{extension}")
}

/// Storage path of a previously uploaded asset, from its public URL.
fn asset_path_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(|name| format!("{ASSET_FOLDER}/{name}"))
}

fn to_row<T: Serialize>(value: &T) -> Result<Value, CatalogError> {
    serde_json::to_value(value)
        .map_err(|e| CatalogError::Record(BackendError::Decode(e.to_string())))
}

fn from_row<T: DeserializeOwned>(row: Value) -> Result<T, CatalogError> {
    serde_json::from_value(row)
        .map_err(|e| CatalogError::Record(BackendError::Decode(e.to_string())))
}

/// Trim and drop blank optional text.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(value)
}

/// Product input after validation.
struct ValidProduct {
    name: String,
    category: String,
    description: String,
    price: Price,
    status: ProductStatus,
    whatsapp: Option<WhatsappNumber>,
    image: Option<DecodedImage>,
}

impl ValidProduct {
    fn parse(input: &ProductInput) -> Result<Self, ValidationError> {
        let name = required(&input.name, "name")?.to_string();
        let category = required(&input.category, "category")?.to_string();
        let price = input.price.parse()?;
        let whatsapp = non_blank(input.whatsapp.as_deref())
            .map(WhatsappNumber::parse)
            .transpose()?;
        let image = input.image.as_ref().map(|image| image.decode()).transpose()?;

        Ok(Self {
            name,
            category,
            description: input.description.trim().to_string(),
            price,
            status: input.status,
            whatsapp,
            image,
        })
    }

    fn into_write(self, image_url: Option<String>) -> ProductWrite {
        ProductWrite {
            name: self.name,
            category: self.category,
            description: self.description,
            price: self.price,
            status: self.status,
            whatsapp: self.whatsapp.map(|number| number.as_str().to_string()),
            image_url,
            store_config_id: None,
            updated_at: None,
        }
    }
}

/// Store configuration input after validation.
struct ValidConfig {
    write: StoreConfigWrite,
    banner: Option<DecodedImage>,
}

impl ValidConfig {
    fn parse(input: &StoreConfigInput) -> Result<Self, ValidationError> {
        let name = required(&input.name, "name")?.to_string();
        let email = Email::parse(required(&input.email, "email")?)?;
        let phone = required(&input.phone, "phone")?.to_string();
        let whatsapp = non_blank(input.whatsapp.as_deref())
            .map(WhatsappNumber::parse_international)
            .transpose()?;
        let banner = input
            .banner_image
            .as_ref()
            .map(|image| image.decode())
            .transpose()?;

        let social_links = crate::models::SocialLinks {
            facebook: input.social_links.facebook.trim().to_string(),
            instagram: input.social_links.instagram.trim().to_string(),
            twitter: input.social_links.twitter.trim().to_string(),
            tiktok: input.social_links.tiktok.trim().to_string(),
        };

        Ok(Self {
            write: StoreConfigWrite {
                name,
                slogan: input.slogan.trim().to_string(),
                store_description: input.store_description.trim().to_string(),
                banner_image_url: String::new(),
                email: email.into_inner(),
                phone,
                whatsapp: whatsapp.map(|n| n.as_str().to_string()).unwrap_or_default(),
                social_links,
                schedule: input.schedule.trim().to_string(),
                updated_at: None,
            },
            banner,
        })
    }
}

struct CatalogInner {
    records: Arc<dyn RecordStore>,
    assets: Arc<dyn AssetStore>,
    cache: RwLock<CatalogSnapshot>,
}

/// Catalog state manager. Cheap to clone; clones share the cache.
#[derive(Clone)]
pub struct CatalogService {
    inner: Arc<CatalogInner>,
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService").finish_non_exhaustive()
    }
}

impl CatalogService {
    /// Create a manager with an empty cache holding the fallback configuration.
    #[must_use]
    pub fn new(records: Arc<dyn RecordStore>, assets: Arc<dyn AssetStore>) -> Self {
        Self {
            inner: Arc::new(CatalogInner {
                records,
                assets,
                cache: RwLock::new(CatalogSnapshot::default()),
            }),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Copy of the cached configuration and products.
    pub async fn snapshot(&self) -> CatalogSnapshot {
        self.inner.cache.read().await.clone()
    }

    /// Cached store configuration.
    pub async fn config(&self) -> StoreConfig {
        self.inner.cache.read().await.config.clone()
    }

    /// Cached products, newest first.
    pub async fn products(&self) -> Vec<Product> {
        self.inner.cache.read().await.products.clone()
    }

    /// Cached product by id.
    pub async fn product(&self, id: ProductId) -> Option<Product> {
        self.inner
            .cache
            .read()
            .await
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    // =========================================================================
    // Loads
    // =========================================================================

    /// Fetch the store configuration into the cache.
    ///
    /// Never fails: no row yields the fallback, as do transport errors and
    /// more than one row (both logged as warnings).
    #[instrument(skip(self))]
    pub async fn load_config(&self) -> StoreConfig {
        let rows = self
            .inner
            .records
            .select(Collection::StoreConfig, RecordQuery::all().limit(2))
            .await;

        let config = match rows {
            Err(e) => {
                warn!(error = %e, "Could not load store configuration, using fallback");
                StoreConfig::fallback()
            }
            Ok(rows) if rows.is_empty() => {
                info!("No store configuration saved yet");
                StoreConfig::fallback()
            }
            Ok(rows) if rows.len() > 1 => {
                warn!(count = rows.len(), "Expected a single store configuration row, using fallback");
                StoreConfig::fallback()
            }
            Ok(mut rows) => match rows.pop().map(from_row::<StoreConfig>) {
                Some(Ok(config)) => config,
                Some(Err(e)) => {
                    warn!(error = %e, "Store configuration row is malformed, using fallback");
                    StoreConfig::fallback()
                }
                None => StoreConfig::fallback(),
            },
        };

        self.inner.cache.write().await.config = config.clone();
        config
    }

    /// Fetch all products, newest first, into the cache.
    ///
    /// Never fails: a transport error yields an empty list and a warning.
    /// Malformed rows are skipped with a warning.
    #[instrument(skip(self))]
    pub async fn load_products(&self) -> Vec<Product> {
        let rows = self
            .inner
            .records
            .select(
                Collection::Products,
                RecordQuery::all().order_desc("created_at"),
            )
            .await;

        let products: Vec<Product> = match rows {
            Ok(rows) => rows
                .into_iter()
                .filter_map(|row| match from_row::<Product>(row) {
                    Ok(product) => Some(product),
                    Err(e) => {
                        warn!(error = %e, "Skipping malformed product row");
                        None
                    }
                })
                .collect(),
            Err(e) => {
                warn!(error = %e, "Could not load products");
                Vec::new()
            }
        };

        debug!(count = products.len(), "Products loaded");
        self.inner.cache.write().await.products.clone_from(&products);
        products
    }

    /// Reload configuration and products.
    pub async fn refresh(&self) -> CatalogSnapshot {
        let (config, products) = tokio::join!(self.load_config(), self.load_products());
        CatalogSnapshot { config, products }
    }

    // =========================================================================
    // Assets
    // =========================================================================

    async fn upload_image(&self, image: DecodedImage, kind: AssetKind) -> Result<String, CatalogError> {
        let path = asset_path(kind, &image.extension);
        self.inner
            .assets
            .upload(&path, image.bytes, &image.content_type)
            .await
            .map_err(CatalogError::Upload)?;
        debug!(path = %path, "Image uploaded");
        Ok(self.inner.assets.public_url(&path))
    }

    /// Remove the asset behind `url`. Failures are logged only.
    async fn remove_image(&self, url: &str) {
        let Some(path) = asset_path_from_url(url) else {
            return;
        };
        match self.inner.assets.remove(std::slice::from_ref(&path)).await {
            Ok(()) => debug!(path = %path, "Image removed"),
            Err(e) => warn!(path = %path, error = %e, "Could not remove image"),
        }
    }

    /// Remove `old` if a different image replaced it.
    async fn remove_replaced(&self, old: Option<&str>, new: &str) {
        if let Some(old) = old
            && old != new
        {
            self.remove_image(old).await;
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add a product.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::Validation`] for bad input, before any remote call
    /// - [`CatalogError::ConfigRequired`] while no configuration is saved
    /// - [`CatalogError::Upload`] if the image upload fails; nothing is written
    /// - [`CatalogError::Record`] if the insert fails; an uploaded image is
    ///   left orphaned
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn add_product(&self, input: ProductInput) -> Result<Product, CatalogError> {
        let mut valid = ValidProduct::parse(&input)?;
        let store_config_id = self
            .inner
            .cache
            .read()
            .await
            .config
            .id
            .ok_or(CatalogError::ConfigRequired)?;

        let image_url = match valid.image.take() {
            Some(image) => self.upload_image(image, AssetKind::Product).await?,
            None => String::new(),
        };

        let mut write = valid.into_write(Some(image_url));
        write.store_config_id = Some(store_config_id);

        let row = self
            .inner
            .records
            .insert(Collection::Products, to_row(&write)?)
            .await
            .map_err(CatalogError::Record)?;
        let product: Product = from_row(row)?;

        self.inner.cache.write().await.products.insert(0, product.clone());
        info!(id = %product.id, "Product added");
        Ok(product)
    }

    /// Update a product.
    ///
    /// Without a new image the stored image URL is left as it is and the asset
    /// store is not called. With one, the previous image is removed after the
    /// upload succeeds and before the record is written.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::Validation`] for bad input, before any remote call
    /// - [`CatalogError::Upload`] if the image upload fails; nothing is written
    /// - [`CatalogError::Record`] if the update fails (`NotFound` for an
    ///   unknown id)
    #[instrument(skip(self, input), fields(id = %id))]
    pub async fn update_product(
        &self,
        id: ProductId,
        input: ProductInput,
    ) -> Result<Product, CatalogError> {
        let mut valid = ValidProduct::parse(&input)?;
        let previous_image = self.product(id).await.and_then(|p| p.image_url);

        let image_url = match valid.image.take() {
            Some(image) => {
                let url = self.upload_image(image, AssetKind::Product).await?;
                self.remove_replaced(previous_image.as_deref(), &url).await;
                Some(url)
            }
            None => None,
        };

        let mut write = valid.into_write(image_url);
        write.updated_at = Some(Utc::now());

        let row = self
            .inner
            .records
            .update(Collection::Products, id.as_i64(), to_row(&write)?)
            .await
            .map_err(CatalogError::Record)?;
        let product: Product = from_row(row)?;

        {
            let mut cache = self.inner.cache.write().await;
            if let Some(cached) = cache.products.iter_mut().find(|p| p.id == id) {
                *cached = product.clone();
            }
        }
        info!("Product updated");
        Ok(product)
    }

    /// Delete a product, then its image on a best-effort basis.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Record`] if the record could not be deleted; the
    /// image is then left alone.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        let image_url = self.product(id).await.and_then(|p| p.image_url);

        self.inner
            .records
            .delete(Collection::Products, id.as_i64())
            .await
            .map_err(CatalogError::Record)?;

        if let Some(url) = image_url {
            self.remove_image(&url).await;
        }

        self.inner.cache.write().await.products.retain(|p| p.id != id);
        info!("Product deleted");
        Ok(())
    }

    /// Save the store configuration.
    ///
    /// Inserts the row while none exists, updates it by id afterwards. A new
    /// banner is uploaded first and replaces the previous one.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::Validation`] for bad input, before any remote call
    /// - [`CatalogError::Upload`] if the banner upload fails; nothing is written
    /// - [`CatalogError::Record`] if the write fails
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn update_store_config(
        &self,
        input: StoreConfigInput,
    ) -> Result<StoreConfig, CatalogError> {
        let ValidConfig { mut write, banner } = ValidConfig::parse(&input)?;
        let current = self.config().await;

        let banner_url = match banner {
            Some(image) => {
                let url = self.upload_image(image, AssetKind::Banner).await?;
                self.remove_replaced(current.banner_image_url.as_deref(), &url)
                    .await;
                Some(url)
            }
            None => current.banner_image_url.clone(),
        };
        write.banner_image_url = banner_url.unwrap_or_default();
        write.updated_at = Some(Utc::now());

        let row = to_row(&write)?;
        let saved = match current.id {
            Some(id) => {
                self.inner
                    .records
                    .update(Collection::StoreConfig, id.as_i64(), row)
                    .await
            }
            None => self.inner.records.insert(Collection::StoreConfig, row).await,
        }
        .map_err(CatalogError::Record)?;
        let config: StoreConfig = from_row(saved)?;

        self.inner.cache.write().await.config = config.clone();
        info!(created = current.id.is_none(), "Store configuration saved");
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::backend::{BackendCall, FailPoint, MemoryBackend};
    use crate::models::ImageUpload;

    fn service(backend: &Arc<MemoryBackend>) -> CatalogService {
        CatalogService::new(backend.clone(), backend.clone())
    }

    fn input(name: &str, price: i64) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            category: "Furniture".to_string(),
            price: Decimal::from(price).into(),
            ..ProductInput::default()
        }
    }

    fn png() -> ImageUpload {
        ImageUpload::File {
            file_name: "photo.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![1, 2, 3, 4],
        }
    }

    async fn with_config(backend: &Arc<MemoryBackend>) -> CatalogService {
        backend
            .seed_row(
                Collection::StoreConfig,
                json!({"name": "Casa Luna", "whatsapp": "+34600000000"}),
            )
            .unwrap();
        let catalog = service(backend);
        catalog.load_config().await;
        backend.clear_calls();
        catalog
    }

    #[test]
    fn test_asset_path_shapes() {
        let path = asset_path(AssetKind::Product, "png");
        let name = path.strip_prefix("public/").unwrap();
        let (stem, ext) = name.rsplit_once('.').unwrap();
        assert_eq!(ext, "png");
        let (millis, suffix) = stem.split_once('_').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), ASSET_SUFFIX_LEN);

        assert!(asset_path(AssetKind::Banner, "jpg").starts_with("public/banner_"));
        assert_ne!(asset_path(AssetKind::Product, "png"), path);
    }

    #[test]
    fn test_asset_path_from_url() {
        assert_eq!(
            asset_path_from_url("https://host/a.png"),
            Some("public/a.png".to_string())
        );
        assert_eq!(
            asset_path_from_url("https://host/storage/v1/object/public/product-images/public/1_x.png?v=2"),
            Some("public/1_x.png".to_string())
        );
        assert_eq!(asset_path_from_url("https://host/"), None);
    }

    #[tokio::test]
    async fn test_load_config_multiple_rows_falls_back() {
        let backend = Arc::new(MemoryBackend::default());
        backend.seed_row(Collection::StoreConfig, json!({"name": "A"})).unwrap();
        backend.seed_row(Collection::StoreConfig, json!({"name": "B"})).unwrap();

        let config = service(&backend).load_config().await;
        assert_eq!(config, StoreConfig::fallback());
    }

    #[tokio::test]
    async fn test_load_config_malformed_row_falls_back() {
        let backend = Arc::new(MemoryBackend::default());
        backend
            .seed_row(
                Collection::StoreConfig,
                json!({"name": 42, "email": ["not", "text"]}),
            )
            .unwrap();
        let catalog = service(&backend);

        assert_eq!(catalog.load_config().await, StoreConfig::fallback());
        assert_eq!(catalog.config().await.id, None);
    }

    #[tokio::test]
    async fn test_load_config_transport_error_falls_back() {
        let backend = Arc::new(MemoryBackend::default());
        backend.seed_row(Collection::StoreConfig, json!({"name": "A"})).unwrap();
        backend.set_failure(FailPoint::Select, true);

        let config = service(&backend).load_config().await;
        assert_eq!(config.id, None);
    }

    #[tokio::test]
    async fn test_load_products_error_is_empty() {
        let backend = Arc::new(MemoryBackend::default());
        backend
            .seed_row(Collection::Products, json!({"name": "X", "category": "Y", "price": 1}))
            .unwrap();
        backend.set_failure(FailPoint::Select, true);

        assert!(service(&backend).load_products().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_products_skips_malformed_rows() {
        let backend = Arc::new(MemoryBackend::default());
        backend
            .seed_row(Collection::Products, json!({"name": "Good", "category": "Y", "price": 3}))
            .unwrap();
        backend
            .seed_row(Collection::Products, json!({"name": "Bad", "category": "Y", "price": -1}))
            .unwrap();

        let products = service(&backend).load_products().await;
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Good");
    }

    #[tokio::test]
    async fn test_validation_runs_before_config_check() {
        let backend = Arc::new(MemoryBackend::default());
        let catalog = service(&backend);

        let err = catalog.add_product(input("  ", 10)).await.unwrap_err();
        assert_eq!(err, CatalogError::Validation(ValidationError::Required("name")));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_add_product_with_image_uploads_then_inserts() {
        let backend = Arc::new(MemoryBackend::default());
        let catalog = with_config(&backend).await;

        let product = catalog
            .add_product(ProductInput {
                image: Some(png()),
                ..input("Lamp", 20)
            })
            .await
            .unwrap();

        let calls = backend.calls();
        assert!(matches!(calls[0], BackendCall::Upload(ref path) if path.starts_with("public/")));
        assert_eq!(calls[1], BackendCall::Insert(Collection::Products));
        assert_eq!(calls.len(), 2);

        let url = product.image_url.unwrap();
        assert!(url.starts_with("https://assets.local/product-images/public/"));
        assert_eq!(backend.asset_paths().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_failure_writes_nothing() {
        let backend = Arc::new(MemoryBackend::default());
        let catalog = with_config(&backend).await;
        backend.set_failure(FailPoint::Upload, true);

        let err = catalog
            .add_product(ProductInput {
                image: Some(png()),
                ..input("Lamp", 20)
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::Upload(_)));
        assert!(backend.rows(Collection::Products).is_empty());
        assert!(catalog.products().await.is_empty());
    }

    #[tokio::test]
    async fn test_record_failure_after_upload_orphans_asset() {
        let backend = Arc::new(MemoryBackend::default());
        let catalog = with_config(&backend).await;
        backend.set_failure(FailPoint::Insert, true);

        let err = catalog
            .add_product(ProductInput {
                image: Some(png()),
                ..input("Lamp", 20)
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::Record(_)));
        assert_eq!(backend.asset_paths().len(), 1);
        assert!(catalog.products().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_whatsapp_rejected_before_remote_calls() {
        let backend = Arc::new(MemoryBackend::default());
        let catalog = with_config(&backend).await;

        let err = catalog
            .add_product(ProductInput {
                whatsapp: Some("0123".to_string()),
                ..input("Lamp", 20)
            })
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "invalid WhatsApp number: phone number cannot start with 0");
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_product_is_not_found() {
        let backend = Arc::new(MemoryBackend::default());
        let catalog = with_config(&backend).await;

        let err = catalog
            .update_product(ProductId::new(404), input("Lamp", 20))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_with_same_fields_keeps_image() {
        let backend = Arc::new(MemoryBackend::default());
        let catalog = with_config(&backend).await;
        let product = catalog
            .add_product(ProductInput {
                image: Some(png()),
                ..input("Lamp", 20)
            })
            .await
            .unwrap();
        backend.clear_calls();

        let updated = catalog
            .update_product(product.id, ProductInput::from_product(&product))
            .await
            .unwrap();

        assert_eq!(updated.image_url, product.image_url);
        assert!(updated.updated_at >= product.updated_at);
        assert!(!backend.calls().iter().any(BackendCall::is_asset_call));
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_product_and_image() {
        let backend = Arc::new(MemoryBackend::default());
        let catalog = with_config(&backend).await;
        let product = catalog
            .add_product(ProductInput {
                image: Some(png()),
                ..input("Lamp", 20)
            })
            .await
            .unwrap();
        backend.set_failure(FailPoint::Delete, true);
        backend.clear_calls();

        assert!(catalog.delete_product(product.id).await.is_err());
        assert_eq!(catalog.products().await.len(), 1);
        assert!(!backend.calls().iter().any(BackendCall::is_asset_call));
    }

    #[tokio::test]
    async fn test_first_config_save_inserts_then_updates() {
        let backend = Arc::new(MemoryBackend::default());
        let catalog = service(&backend);
        catalog.load_config().await;

        let form = StoreConfigInput {
            name: "Casa Luna".to_string(),
            email: "hola@casaluna.example".to_string(),
            phone: "+34 600 000 000".to_string(),
            whatsapp: Some("+34600000000".to_string()),
            ..StoreConfigInput::default()
        };

        let created = catalog.update_store_config(form.clone()).await.unwrap();
        assert!(created.id.is_some());
        assert_eq!(catalog.config().await, created);

        let renamed = catalog
            .update_store_config(StoreConfigInput {
                name: "Casa Sol".to_string(),
                ..form
            })
            .await
            .unwrap();
        assert_eq!(renamed.id, created.id);
        assert_eq!(renamed.name, "Casa Sol");
        assert_eq!(backend.rows(Collection::StoreConfig).len(), 1);
    }

    #[tokio::test]
    async fn test_config_validation() {
        let backend = Arc::new(MemoryBackend::default());
        let catalog = service(&backend);

        let form = StoreConfigInput {
            name: "Casa Luna".to_string(),
            email: "not-an-email".to_string(),
            phone: "600".to_string(),
            ..StoreConfigInput::default()
        };
        let err = catalog.update_store_config(form.clone()).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(ValidationError::Email(_))));

        let err = catalog
            .update_store_config(StoreConfigInput {
                email: "hola@casaluna.example".to_string(),
                whatsapp: Some("34600000000".to_string()),
                ..form
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(ValidationError::Whatsapp(_))));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_new_banner_replaces_old_one() {
        let backend = Arc::new(MemoryBackend::default());
        let old_url = backend.seed_asset("public/banner_1_old.png", vec![9]);
        backend
            .seed_row(
                Collection::StoreConfig,
                json!({"name": "Casa Luna", "email": "a@b.co", "phone": "1", "banner_image_url": old_url}),
            )
            .unwrap();
        let catalog = service(&backend);
        catalog.load_config().await;
        backend.clear_calls();

        let saved = catalog
            .update_store_config(StoreConfigInput {
                name: "Casa Luna".to_string(),
                email: "a@b.co".to_string(),
                phone: "1".to_string(),
                banner_image: Some(png()),
                ..StoreConfigInput::default()
            })
            .await
            .unwrap();

        let new_url = saved.banner_image_url.unwrap();
        assert!(new_url.contains("/public/banner_"));
        assert_eq!(
            backend.calls()[1],
            BackendCall::Remove(vec!["public/banner_1_old.png".to_string()])
        );
        assert_eq!(backend.asset_paths().len(), 1);
    }

    #[tokio::test]
    async fn test_config_without_banner_keeps_existing_banner() {
        let backend = Arc::new(MemoryBackend::default());
        backend
            .seed_row(
                Collection::StoreConfig,
                json!({"name": "Casa Luna", "banner_image_url": "https://host/banner.png"}),
            )
            .unwrap();
        let catalog = service(&backend);
        catalog.load_config().await;

        let saved = catalog
            .update_store_config(StoreConfigInput {
                name: "Casa Luna".to_string(),
                email: "a@b.co".to_string(),
                phone: "1".to_string(),
                ..StoreConfigInput::default()
            })
            .await
            .unwrap();
        assert_eq!(saved.banner_image_url.as_deref(), Some("https://host/banner.png"));
    }
}

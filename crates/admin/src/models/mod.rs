//! Domain models for the storefront.
//!
//! Records travel to and from the record store as JSON rows; these types own
//! the typed mapping of the `store_config` and `products` columns.

pub mod image;
pub mod product;
pub mod session;
pub mod store_config;

pub use image::{DecodedImage, ImageError, ImageUpload, MAX_IMAGE_BYTES};
pub use product::{PriceInput, Product, ProductInput, ProductWrite};
pub use session::{CurrentAdmin, keys as session_keys};
pub use store_config::{SocialLinks, StoreConfig, StoreConfigInput, StoreConfigWrite};

use serde::{Deserialize, Deserializer};

/// Deserialize a nullable text column, mapping `null` and `""` to `None`.
pub(crate) fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Deserialize a nullable text column, mapping `null` to `""`.
pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

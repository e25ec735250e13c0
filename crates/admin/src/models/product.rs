//! Catalog products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vitrina_core::{Price, PriceError, ProductId, ProductStatus, StoreConfigId};

use super::{ImageUpload, StoreConfig, empty_as_none, null_as_empty};

/// A product as held in the catalog cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub status: ProductStatus,
    /// Per-product WhatsApp override. See [`Product::contact_number`].
    #[serde(default, deserialize_with = "empty_as_none")]
    pub whatsapp: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub store_config_id: Option<StoreConfigId>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Number customers should contact about this product: the product's own
    /// override, else the store's number.
    #[must_use]
    pub fn contact_number<'a>(&'a self, store: &'a StoreConfig) -> Option<&'a str> {
        self.whatsapp.as_deref().or_else(|| store.whatsapp())
    }
}

/// Price as submitted: a JSON number, or the text of a form field.
///
/// Checked by [`PriceInput::parse`] during validation, so a non-numeric value
/// is reported against the `price` field like any other bad price.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Amount(Decimal),
    Text(String),
}

impl PriceInput {
    /// The validated price.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::NotANumber`] for non-numeric text and
    /// [`PriceError::NotPositive`] for amounts `<= 0`.
    pub fn parse(&self) -> Result<Price, PriceError> {
        match self {
            Self::Amount(amount) => Price::new(*amount),
            Self::Text(text) => Price::parse(text),
        }
    }
}

impl Default for PriceInput {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<Decimal> for PriceInput {
    fn from(amount: Decimal) -> Self {
        Self::Amount(amount)
    }
}

/// Product form submission.
///
/// Fields arrive unchecked; the catalog service validates them before any
/// remote call. Missing fields decode as blank and fail validation there.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: PriceInput,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub whatsapp: Option<String>,
    /// New image, if one was chosen.
    #[serde(default)]
    pub image: Option<ImageUpload>,
}

impl ProductInput {
    /// Input carrying the same fields as `product` and no new image.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            category: product.category.clone(),
            description: product.description.clone(),
            price: product.price.amount().into(),
            status: product.status,
            whatsapp: product.whatsapp.clone(),
            image: None,
        }
    }
}

/// Columns written on insert or update of a product row.
///
/// On update, `image_url` is omitted unless a new image was uploaded so the
/// stored URL stays as it is.
#[derive(Debug, Clone, Serialize)]
pub struct ProductWrite {
    pub name: String,
    pub category: String,
    pub description: String,
    pub price: Price,
    pub status: ProductStatus,
    pub whatsapp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_config_id: Option<StoreConfigId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

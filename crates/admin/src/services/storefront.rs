//! Public catalog views and dashboard figures.
//!
//! Pure functions over cached catalog state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vitrina_core::ProductStatus;

use crate::models::{Product, StoreConfig};

/// Category value meaning "no category filter".
pub const ALL_CATEGORIES: &str = "all";

/// Public listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogFilter {
    /// Free-text search over name, description and category.
    #[serde(default, rename = "q")]
    pub query: Option<String>,
    /// Exact category, or `all`.
    #[serde(default)]
    pub category: Option<String>,
}

impl CatalogFilter {
    /// Whether `product` appears in the public listing under this filter.
    ///
    /// Sold products never appear.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if !product.status.is_listed() {
            return false;
        }

        let category_ok = match self.category.as_deref().map(str::trim) {
            None | Some("" | ALL_CATEGORIES) => true,
            Some(category) => product.category == category,
        };
        if !category_ok {
            return false;
        }

        match self.query.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(query) => {
                let needle = query.to_lowercase();
                [&product.name, &product.description, &product.category]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
        }
    }

    /// Products visible under this filter, in the given order.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Distinct non-empty categories in first-seen order.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for product in products {
        let category = product.category.trim();
        if !category.is_empty() && !seen.iter().any(|c| c == category) {
            seen.push(category.to_string());
        }
    }
    seen
}

/// Message pre-filled when a customer asks about a product.
#[must_use]
pub fn product_inquiry(product: &Product) -> String {
    format!(
        "Hello! I'm interested in the product: {}. Could you give me more information?",
        product.name
    )
}

/// `https://wa.me/` link opening a chat with `number`, pre-filled with `message`.
///
/// Everything but digits and `+` is dropped from the number.
#[must_use]
pub fn whatsapp_link(number: &str, message: &str) -> String {
    let digits: String = number
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    format!("https://wa.me/{digits}?text={}", urlencoding::encode(message))
}

/// Link for asking about `product`, if anyone can be contacted.
#[must_use]
pub fn product_whatsapp_link(product: &Product, store: &StoreConfig) -> Option<String> {
    product
        .contact_number(store)
        .map(|number| whatsapp_link(number, &product_inquiry(product)))
}

/// Social profile URL: `https://` is added unless a scheme is present.
#[must_use]
pub fn social_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    }
}

/// Dashboard summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_products: usize,
    pub available_products: usize,
    pub sold_products: usize,
    /// Sum of the prices of available products.
    pub total_value: Decimal,
}

impl DashboardStats {
    /// Compute the summary for `products`.
    #[must_use]
    pub fn from_products(products: &[Product]) -> Self {
        products.iter().fold(Self::default(), |mut stats, product| {
            stats.total_products += 1;
            match product.status {
                ProductStatus::Available => {
                    stats.available_products += 1;
                    stats.total_value += product.price.amount();
                }
                ProductStatus::Sold => stats.sold_products += 1,
                ProductStatus::OutOfStock => {}
            }
            stats
        })
    }
}

//! Public catalog page.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Serialize;

use crate::models::{Product, StoreConfig};
use crate::services::storefront::{self, CatalogFilter};
use crate::state::AppState;

/// Build the public storefront router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/storefront", get(storefront_page))
}

/// A social profile link, ready to render.
#[derive(Debug, Serialize)]
pub struct SocialLink {
    pub network: &'static str,
    pub url: String,
}

/// A listed product with its contact link.
#[derive(Debug, Serialize)]
pub struct PublicProduct {
    #[serde(flatten)]
    pub product: Product,
    /// WhatsApp chat link, when the product or the store has a number.
    pub whatsapp_url: Option<String>,
}

/// Everything the public page renders.
#[derive(Debug, Serialize)]
pub struct StorefrontPage {
    pub store: StoreConfig,
    pub social_links: Vec<SocialLink>,
    /// Categories of listed products, first-seen order.
    pub categories: Vec<String>,
    /// Listed products matching the filter, newest first.
    pub products: Vec<PublicProduct>,
}

/// Public page data: store details and the filtered, listed products.
pub async fn storefront_page(
    State(state): State<AppState>,
    Query(filter): Query<CatalogFilter>,
) -> Json<StorefrontPage> {
    let snapshot = state.catalog().snapshot().await;

    let listed: Vec<Product> = snapshot
        .products
        .iter()
        .filter(|p| p.status.is_listed())
        .cloned()
        .collect();
    let categories = storefront::categories(&listed);

    let products = filter
        .apply(&listed)
        .into_iter()
        .map(|product| PublicProduct {
            whatsapp_url: storefront::product_whatsapp_link(product, &snapshot.config),
            product: product.clone(),
        })
        .collect();

    let social_links = snapshot
        .config
        .social_links
        .entries()
        .into_iter()
        .map(|(network, raw)| SocialLink {
            network,
            url: storefront::social_url(raw),
        })
        .collect();

    Json(StorefrontPage {
        store: snapshot.config,
        social_links,
        categories,
        products,
    })
}

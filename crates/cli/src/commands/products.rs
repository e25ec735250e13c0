//! Product inspection.

use tracing::info;

use vitrina_admin::services::DashboardStats;

/// Print all products, newest first, followed by summary figures.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached.
pub async fn list(memory: bool) -> Result<(), Box<dyn std::error::Error>> {
    let state = super::connect(memory)?;
    let snapshot = state.catalog().refresh().await;

    for product in &snapshot.products {
        info!(
            "#{:<5} {:<32} {:<16} {:>10} {:<12} {}",
            product.id.to_string(),
            product.name,
            product.category,
            product.price.to_string(),
            product.status.to_string(),
            product.contact_number(&snapshot.config).unwrap_or("-"),
        );
    }

    let stats = DashboardStats::from_products(&snapshot.products);
    info!(
        "{} products ({} available, {} sold), available value {}",
        stats.total_products, stats.available_products, stats.sold_products, stats.total_value
    );

    Ok(())
}

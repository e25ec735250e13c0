//! Store configuration inspection.

use tracing::{info, warn};

/// Print the store configuration.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached.
pub async fn show(memory: bool) -> Result<(), Box<dyn std::error::Error>> {
    let state = super::connect(memory)?;
    let config = state.catalog().load_config().await;

    if !config.exists() {
        warn!("No store configuration saved yet; showing the fallback");
    }

    info!("Store configuration");
    info!("===================");
    info!("Name:        {}", config.name);
    info!("Slogan:      {}", config.slogan);
    info!("Description: {}", config.store_description);
    info!("Email:       {}", config.email);
    info!("Phone:       {}", config.phone);
    info!("WhatsApp:    {}", config.whatsapp().unwrap_or("-"));
    info!("Schedule:    {}", config.schedule);
    info!(
        "Banner:      {}",
        config.banner_image_url.as_deref().unwrap_or("-")
    );
    for (network, link) in config.social_links.entries() {
        info!("{network:<12} {link}");
    }

    Ok(())
}

//! The singleton store configuration record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vitrina_core::StoreConfigId;

use super::{ImageUpload, empty_as_none, null_as_empty};

/// Name shown while no configuration has been saved yet.
pub const FALLBACK_STORE_NAME: &str = "Your Online Store";

/// Social profile links. Stored as flat columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub facebook: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub instagram: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub twitter: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tiktok: String,
}

impl SocialLinks {
    /// Non-empty links as `(network, raw value)` pairs.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("facebook", self.facebook.as_str()),
            ("instagram", self.instagram.as_str()),
            ("twitter", self.twitter.as_str()),
            ("tiktok", self.tiktok.as_str()),
        ]
        .into_iter()
        .filter(|(_, link)| !link.trim().is_empty())
        .collect()
    }
}

/// Store configuration, as held in the catalog cache.
///
/// `id == None` means nothing has been saved yet; the cache then holds
/// [`StoreConfig::fallback`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub id: Option<StoreConfigId>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub slogan: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub store_description: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub banner_image_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub whatsapp: String,
    #[serde(flatten)]
    pub social_links: SocialLinks,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub schedule: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StoreConfig {
    /// Placeholder used until a configuration is saved, or when loading fails.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            id: None,
            name: FALLBACK_STORE_NAME.to_string(),
            slogan: String::new(),
            store_description: String::new(),
            banner_image_url: None,
            email: String::new(),
            phone: String::new(),
            whatsapp: String::new(),
            social_links: SocialLinks::default(),
            schedule: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Whether the configuration has been persisted.
    #[must_use]
    pub const fn exists(&self) -> bool {
        self.id.is_some()
    }

    /// Store WhatsApp number, if set.
    #[must_use]
    pub fn whatsapp(&self) -> Option<&str> {
        Some(self.whatsapp.trim()).filter(|number| !number.is_empty())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Settings form submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfigInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slogan: String,
    #[serde(default)]
    pub store_description: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub whatsapp: Option<String>,
    #[serde(flatten)]
    pub social_links: SocialLinks,
    #[serde(default)]
    pub schedule: String,
    /// New banner image, if one was chosen.
    #[serde(default)]
    pub banner_image: Option<ImageUpload>,
}

/// Columns written on insert or update of the configuration row.
#[derive(Debug, Clone, Serialize)]
pub struct StoreConfigWrite {
    pub name: String,
    pub slogan: String,
    pub store_description: String,
    /// `""` when the store has no banner.
    pub banner_image_url: String,
    pub email: String,
    pub phone: String,
    pub whatsapp: String,
    #[serde(flatten)]
    pub social_links: SocialLinks,
    pub schedule: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

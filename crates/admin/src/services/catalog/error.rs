//! Catalog errors.

use thiserror::Error;

use vitrina_core::{EmailError, PhoneError, PriceError};

use crate::backend::BackendError;
use crate::models::ImageError;

/// Input refused before any remote call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("invalid price: {0}")]
    Price(#[from] PriceError),

    #[error("invalid WhatsApp number: {0}")]
    Whatsapp(#[from] PhoneError),

    #[error("invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("invalid image: {0}")]
    Image(#[from] ImageError),
}

impl ValidationError {
    /// Form field the error belongs to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::Required(field) => field,
            Self::Price(_) => "price",
            Self::Whatsapp(_) => "whatsapp",
            Self::Email(_) => "email",
            Self::Image(_) => "image",
        }
    }
}

/// Failure of a catalog operation.
///
/// Every variant leaves the cache as it was before the call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Products need a saved store configuration to belong to.
    #[error("save the store configuration before adding products")]
    ConfigRequired,

    #[error("image upload failed: {0}")]
    Upload(#[source] BackendError),

    #[error("saving the record failed: {0}")]
    Record(#[source] BackendError),
}

impl CatalogError {
    /// Whether the addressed record does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Record(BackendError::NotFound))
    }
}

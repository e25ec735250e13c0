//! Product availability status.

use serde::{Deserialize, Serialize};

/// Availability of a catalog product.
///
/// Stored in the record store's `status` column as kebab-case text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProductStatus {
    /// In stock and purchasable.
    #[default]
    Available,
    /// Listed, but temporarily unavailable.
    OutOfStock,
    /// Sold; hidden from the public catalog.
    Sold,
}

impl ProductStatus {
    /// All statuses, in display order.
    pub const ALL: [Self; 3] = [Self::Available, Self::OutOfStock, Self::Sold];

    /// Whether products with this status appear in the public catalog.
    #[must_use]
    pub const fn is_listed(self) -> bool {
        !matches!(self, Self::Sold)
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::OutOfStock => "out-of-stock",
            Self::Sold => "sold",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::OutOfStock => "Out of stock",
            Self::Sold => "Sold",
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "out-of-stock" => Ok(Self::OutOfStock),
            "sold" => Ok(Self::Sold),
            _ => Err(format!("invalid product status: {s}")),
        }
    }
}

//! Business logic services.
//!
//! # Services
//!
//! - `identity` - Single-admin identity gate over the identity provider
//! - `catalog` - Store configuration and product catalog state manager
//! - `storefront` - Public listing filters, contact links and dashboard figures

pub mod catalog;
pub mod identity;
pub mod storefront;

pub use catalog::{CatalogError, CatalogService, CatalogSnapshot, ValidationError};
pub use identity::{AdminSession, AuthError, GateState, IdentityGate, SessionListener};
pub use storefront::{CatalogFilter, DashboardStats};

//! Application state shared across handlers.

use std::sync::Arc;

use vitrina_core::Email;

use crate::backend::{AssetStore, IdentityProvider, RecordStore};
use crate::services::{CatalogService, IdentityGate};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    gate: IdentityGate,
    catalog: CatalogService,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("gate", &self.inner.gate)
            .field("catalog", &self.inner.catalog)
            .finish()
    }
}

impl AppState {
    /// Create state from already constructed services.
    #[must_use]
    pub fn new(gate: IdentityGate, catalog: CatalogService) -> Self {
        Self {
            inner: Arc::new(AppStateInner { gate, catalog }),
        }
    }

    /// Wire both services to a backend implementing all three collaborator traits.
    #[must_use]
    pub fn from_backend<B>(backend: Arc<B>, admin_email: Email) -> Self
    where
        B: IdentityProvider + RecordStore + AssetStore + 'static,
    {
        let gate = IdentityGate::new(backend.clone(), admin_email);
        let catalog = CatalogService::new(backend.clone(), backend);
        Self::new(gate, catalog)
    }

    /// Identity gate.
    #[must_use]
    pub fn gate(&self) -> &IdentityGate {
        &self.inner.gate
    }

    /// Catalog state manager.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }
}

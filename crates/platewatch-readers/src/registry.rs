//! Compile-time reader registry.
//!
//! The provider set is statically auditable: every reader is constructed
//! and registered explicitly at startup, then the registry is handed to
//! the engine. There is no runtime discovery.

use crate::reader::CitationReader;
use platewatch_core::Provider;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Mapping from [`Provider`] to its constructed reader.
#[derive(Default)]
pub struct ReaderRegistry {
    readers: HashMap<Provider, Arc<dyn CitationReader>>,
}

impl std::fmt::Debug for ReaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}

impl ReaderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reader under the provider it reports.
    ///
    /// Registering a second reader for the same provider replaces the
    /// first.
    pub fn register(&mut self, reader: Arc<dyn CitationReader>) {
        let provider = reader.provider();
        debug!(%provider, "registering citation reader");
        self.readers.insert(provider, reader);
    }

    /// Get the reader for a provider, if one is registered.
    #[must_use]
    pub fn get(&self, provider: Provider) -> Option<Arc<dyn CitationReader>> {
        self.readers.get(&provider).cloned()
    }

    /// Whether a reader is registered for the provider.
    #[must_use]
    pub fn contains(&self, provider: Provider) -> bool {
        self.readers.contains_key(&provider)
    }

    /// Providers with a registered reader, in [`Provider::ALL`] order.
    #[must_use]
    pub fn providers(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.readers.contains_key(p))
            .collect()
    }

    /// Number of registered readers.
    #[must_use]
    pub fn count(&self) -> usize {
        self.readers.len()
    }
}

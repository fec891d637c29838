//! The pluggable provider boundary.

use crate::error::Result;
use async_trait::async_trait;
use platewatch_core::{CitationRecord, Provider};

/// Fetch-and-normalize adapter for one provider.
///
/// Implementations own everything provider-specific: endpoint, payload
/// shape, and the mapping from the provider's notion of "nothing here"
/// onto an empty success. The engine only sees this contract.
#[async_trait]
pub trait CitationReader: Send + Sync {
    /// The provider this reader serves.
    fn provider(&self) -> Provider;

    /// Look up citations for one plate.
    ///
    /// "No citations found" is a success with an empty list, never an
    /// error.
    async fn read_citations(&self, plate: &str, state: &str) -> Result<Vec<CitationRecord>>;
}

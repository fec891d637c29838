//! Collaborator contracts consumed by the engine.
//!
//! The engine depends on these traits only; the concrete backend clients
//! in this crate implement them, and tests substitute scripted mocks.

use crate::error::Result;
use crate::violations::ViolationSubmission;
use async_trait::async_trait;
use platewatch_core::Vehicle;

/// Obtains a credential for the fleet backend.
///
/// On success a bearer token becomes available through the token cache
/// the HTTP layer consults; callers never see the credential itself.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Attempt to sign in. Returns whether a credential is now cached.
    async fn try_authorize(&self) -> bool;
}

/// Source of the fleet vehicle list.
#[async_trait]
pub trait VehicleSource: Send + Sync {
    /// Fetch the current vehicle snapshot.
    async fn vehicles(&self) -> Result<Vec<Vehicle>>;
}

/// Push target for normalized violation records.
#[async_trait]
pub trait ViolationSink: Send + Sync {
    /// Submit one violation record.
    async fn submit(&self, violation: &ViolationSubmission) -> Result<()>;
}

/// One-shot credential refresh hook used by the retry path on HTTP 401.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Re-acquire a credential. Returns whether refresh succeeded.
    async fn refresh(&self) -> bool;
}

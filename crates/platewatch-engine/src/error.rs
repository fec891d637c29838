//! Engine error type.
//!
//! Only genuinely fatal conditions surface here; per-cell and per-record
//! failures are collected into the run report instead. Cancellation is a
//! first-class variant so flow control never rides on panics.

use platewatch_client::ClientError;
use platewatch_core::Provider;
use platewatch_readers::ReaderError;
use thiserror::Error;

/// Fatal run failures and cancellation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Sign-in failed; no provider call can succeed without a credential
    #[error("authorization failed, cannot start citation run")]
    AuthorizationFailed,

    /// The vehicle list could not be fetched
    #[error("failed to fetch fleet vehicles: {0}")]
    VehicleFetch(#[source] ClientError),

    /// The vehicle list came back empty; a run with zero work is a
    /// misconfiguration, not "zero citations found"
    #[error("fleet vehicle list is empty")]
    NoVehicles,

    /// No reader is registered for the requested provider
    #[error("no reader registered for provider {0}")]
    NoReader(Provider),

    /// An ad hoc lookup failed at the provider
    #[error("provider read failed: {0}")]
    Read(#[from] ReaderError),

    /// The run or lookup was cancelled (externally, or by timeout)
    #[error("run cancelled")]
    Cancelled,
}

/// Result type alias using `EngineError`.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            EngineError::NoVehicles.to_string(),
            "fleet vehicle list is empty"
        );
        assert_eq!(
            EngineError::NoReader(Provider::Metropolis).to_string(),
            "no reader registered for provider Metropolis"
        );
    }
}

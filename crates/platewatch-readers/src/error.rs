//! Reader error type.

use platewatch_client::ClientError;
use thiserror::Error;

/// A structured failure from one provider read.
///
/// Carries a message and a numeric code (an HTTP status where one
/// exists, a provider-specific code otherwise). "No citations found" is
/// never an error; readers return an empty list for it.
#[derive(Debug, Clone, Error)]
#[error("{message} (code {code})")]
pub struct ReaderError {
    /// What went wrong
    pub message: String,
    /// Numeric error code
    pub code: i32,
}

impl ReaderError {
    /// Build a reader error.
    #[must_use]
    pub fn new(message: impl Into<String>, code: i32) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }
}

impl From<ClientError> for ReaderError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api { status, message } => Self::new(message, i32::from(status)),
            ClientError::Cancelled => Self::new("request cancelled", 0),
        }
    }
}

/// Result type alias using `ReaderError`.
pub type Result<T> = std::result::Result<T, ReaderError>;

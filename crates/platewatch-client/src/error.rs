//! Client error types.

use thiserror::Error;

/// Errors from backend and provider HTTP calls.
///
/// Every transport-level problem is classified into an [`Api`] failure
/// with an HTTP-ish status code, so callers see one uniform shape.
/// Cancellation is its own variant, never an `Api` failure.
///
/// [`Api`]: ClientError::Api
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Classified request failure: HTTP status (or synthetic code) plus message
    #[error("request failed ({status}): {message}")]
    Api {
        /// HTTP status, or a synthetic code for non-HTTP failures
        status: u16,
        /// Human-readable failure description
        message: String,
    },

    /// The caller's cancellation token fired
    #[error("request cancelled")]
    Cancelled,
}

impl ClientError {
    /// Build a classified failure.
    #[must_use]
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Status code of the failure, `0` for cancellation.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Api { status, .. } => *status,
            Self::Cancelled => 0,
        }
    }

    /// Whether this failure is an HTTP 401.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == 401
    }
}

/// Well-known message for an HTTP status code.
///
/// Unknown codes fall back to echoing the response body.
#[must_use]
pub fn status_message(status: u16, body: &str) -> String {
    match status {
        400 => "Bad request".to_string(),
        401 => "Unauthorized".to_string(),
        403 => "Forbidden".to_string(),
        404 => "Not found".to_string(),
        409 => "Conflict".to_string(),
        422 => "Unprocessable entity".to_string(),
        429 => "Too many requests".to_string(),
        500 => "Internal server error".to_string(),
        502 => "Bad gateway".to_string(),
        503 => "Service unavailable".to_string(),
        504 => "Gateway timeout".to_string(),
        _ => format!("HTTP {status}: {body}"),
    }
}

/// Result type alias using `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_table() {
        assert_eq!(status_message(401, ""), "Unauthorized");
        assert_eq!(status_message(429, ""), "Too many requests");
        assert_eq!(status_message(418, "teapot"), "HTTP 418: teapot");
    }

    #[test]
    fn test_unauthorized_detection() {
        assert!(ClientError::api(401, "Unauthorized").is_unauthorized());
        assert!(!ClientError::api(500, "boom").is_unauthorized());
        assert!(!ClientError::Cancelled.is_unauthorized());
    }
}

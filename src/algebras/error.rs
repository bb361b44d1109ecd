//! Error types for algebra traits.
//!
//! These errors are used by the algebra layer and are intentionally
//! domain-specific rather than generic. They are `Clone` so a single
//! failure can be handed to every waiter of a shared fetch.

use std::fmt;

/// Error that can occur while retrieving raw assets.
///
/// This is the error type for [`AssetSource`](super::AssetSource) operations.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The requested asset was not found (404).
    NotFound { url: String },

    /// The remote refused the request.
    Unauthorized { reason: String },

    /// The server answered with an unexpected status.
    HttpStatus { status: u16, url: String },

    /// Network or transport error.
    Transport { message: String },

    /// The response could not be parsed.
    MalformedResponse { reason: String },

    /// The request was aborted through its cancellation token.
    Aborted { url: String },

    /// An operation timed out.
    Timeout { operation: String },

    /// Some other error occurred.
    Other { message: String },
}

impl FetchError {
    /// Returns `true` if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::Transport { .. }
                | Self::HttpStatus {
                    status: 408 | 429 | 500..=599,
                    ..
                }
        )
    }

    /// Returns `true` if the request was cancelled rather than failed.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { url } => write!(f, "Asset not found: {}", url),
            Self::Unauthorized { reason } => write!(f, "Unauthorized: {}", reason),
            Self::HttpStatus { status, url } => write!(f, "HTTP {} from {}", status, url),
            Self::Transport { message } => write!(f, "Transport error: {}", message),
            Self::MalformedResponse { reason } => write!(f, "Malformed response: {}", reason),
            Self::Aborted { url } => write!(f, "Request aborted: {}", url),
            Self::Timeout { operation } => write!(f, "Timeout during: {}", operation),
            Self::Other { message } => write!(f, "Error: {}", message),
        }
    }
}

impl std::error::Error for FetchError {}

// ==============================================================================
// Conversion from transport errors
// ==============================================================================

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout {
                operation: err
                    .url()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "request".to_string()),
            };
        }
        if err.is_decode() {
            return Self::MalformedResponse {
                reason: err.to_string(),
            };
        }
        match err.status() {
            Some(status) => Self::HttpStatus {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            },
            None => Self::Transport {
                message: err.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_is_retryable() {
        assert!(FetchError::Timeout {
            operation: "image".to_string()
        }
        .is_retryable());
        assert!(FetchError::HttpStatus {
            status: 503,
            url: "https://assets/a".to_string()
        }
        .is_retryable());
        assert!(!FetchError::NotFound {
            url: "https://assets/a".to_string()
        }
        .is_retryable());
        assert!(!FetchError::Aborted {
            url: "https://assets/a".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_fetch_error_classification() {
        assert!(!FetchError::NotFound {
            url: "x".to_string()
        }
        .is_aborted());
        assert!(FetchError::Aborted {
            url: "x".to_string()
        }
        .is_aborted());
    }

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::HttpStatus {
            status: 500,
            url: "https://assets/a.png".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 500 from https://assets/a.png");
    }
}

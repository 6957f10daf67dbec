//! Error types for the HTTP clients.

use thiserror::Error;

/// Errors that can occur when talking to the aggregator or automation host.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid base URL or client construction failure.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Transport-level HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("HTTP {status}: {path}")]
    Status { status: u16, path: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ClientError {
    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Connection(_) | Self::Serialization(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transience() {
        let server = ClientError::Status {
            status: 503,
            path: "/videos".into(),
        };
        let throttled = ClientError::Status {
            status: 429,
            path: "/results".into(),
        };
        let missing = ClientError::Status {
            status: 404,
            path: "/videos".into(),
        };
        assert!(server.is_transient());
        assert!(throttled.is_transient());
        assert!(!missing.is_transient());
        assert_eq!(missing.to_string(), "HTTP 404: /videos");
    }
}

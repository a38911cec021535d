//! Provider error types and handling

use std::time::Duration;
use thiserror::Error;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors surfaced to callers of the adapter
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Missing or rejected API key
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Network or connection error (transport failure)
    #[error("Network error: {0}")]
    Network(String),

    /// Timeout occurred
    #[error("Request timed out")]
    Timeout,

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded{}", .retry_after.map(|d| format!(", retry after {}s", d.as_secs())).unwrap_or_default())]
    RateLimit { retry_after: Option<Duration> },

    /// Model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Provider-side failure
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Response parsing error
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Response exceeded the configured size limit
    #[error("Response size {size} exceeds maximum {limit}")]
    ResponseTooLarge { size: usize, limit: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider returned an error not covered above
    #[error("Provider error: {code}: {message}")]
    Api { code: String, message: String },
}

impl ProviderError {
    /// Whether the error came from the transport rather than the provider
    pub fn is_transport(&self) -> bool {
        matches!(self, ProviderError::Network(_) | ProviderError::Timeout)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_connect() {
            ProviderError::Network(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            ProviderError::Parse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_display() {
        let err = ProviderError::RateLimit {
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(err.to_string(), "Rate limit exceeded, retry after 7s");

        let err = ProviderError::RateLimit { retry_after: None };
        assert_eq!(err.to_string(), "Rate limit exceeded");
    }

    #[test]
    fn test_transport_classification() {
        assert!(ProviderError::Timeout.is_transport());
        assert!(ProviderError::Network("reset".into()).is_transport());
        assert!(!ProviderError::Authentication("no key".into()).is_transport());
    }

    #[test]
    fn test_from_serde_error() {
        let err: ProviderError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, ProviderError::Parse(_)));
    }
}

//! Error types for providers.

use thiserror::Error;

/// Errors that can occur when querying a metrics provider or state store.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The requested job, component or metric does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The provider is known to be down.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Failed to read a local state file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// Check whether the provider as a whole is unreachable.
    ///
    /// Unreachable providers fail an entire sensor call. Every other error
    /// only concerns the single query that produced it.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            ProviderError::Connection(_) | ProviderError::Unavailable(_)
        )
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Parse(err.to_string())
    }
}

#[cfg(feature = "tracker")]
impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_connect() {
            ProviderError::Connection(err.to_string())
        } else if err.is_decode() {
            ProviderError::Parse(err.to_string())
        } else {
            ProviderError::Http(err.to_string())
        }
    }
}

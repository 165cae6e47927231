//! Error types for the coin tracker

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when fetching data from a market data source
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The source does not know the requested coin
    #[error("Coin not found: {0}")]
    NotFound(String),

    /// Invalid response from source
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Source API error
    #[error("Source API error: {0}")]
    ApiError(String),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,
}

impl SourceError {
    /// Creates a NotFound error
    pub fn not_found(coin_id: &str) -> Self {
        Self::NotFound(coin_id.to_string())
    }

    /// Creates an InvalidResponse error
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// True for failures caused by the transport rather than the payload
    pub fn is_network(&self) -> bool {
        matches!(self, Self::NetworkError(_) | Self::Timeout)
    }
}

/// Errors raised by the favorites provider
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FavoritesError {
    /// Favorites may only be changed by a signed-in user
    #[error("Sign in to manage favorites")]
    RequiresAuth,
}

/// Errors that can occur when reading or writing persisted preferences
#[derive(Debug, Error)]
pub enum PersistError {
    /// Reading or writing the storage file failed
    #[error("Storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stored document could not be (de)serialized
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PersistError {
    /// Creates an Io error bound to the file it concerns
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while building a `TrackerConfig`
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A setting has a value the tracker cannot use
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    /// Creates an Invalid error
    pub fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while building a `CoinTracker`
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to create market data source: {0}")]
    Source(#[from] SourceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_messages() {
        assert_eq!(
            SourceError::not_found("dogecoin").to_string(),
            "Coin not found: dogecoin"
        );
        assert!(SourceError::Timeout.is_network());
        assert!(!SourceError::RateLimitExceeded.is_network());
    }

    #[test]
    fn test_config_error_message() {
        let err = ConfigError::invalid("refresh_interval", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "Invalid value for refresh_interval: must be greater than zero"
        );
    }
}

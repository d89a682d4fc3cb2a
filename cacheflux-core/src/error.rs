//! Error types for CacheFlux

use thiserror::Error;

/// Result type alias for CacheFlux operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// CacheFlux error taxonomy
///
/// `Configuration` is the only class that is fatal to callers of
/// [`CacheManager::acquire`](crate::CacheManager::acquire); everything else
/// is logged and degraded per operation.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Broken or missing configuration (unknown backend type, empty url, ...)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network or backend failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Failure during key enumeration or copy between backends
    #[error("Migration error: {0}")]
    Migration(String),

    /// Malformed stats payload or timeout while sampling a backend
    #[error("Metrics collection error: {0}")]
    Metrics(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    /// True for errors that should stop startup instead of degrading
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

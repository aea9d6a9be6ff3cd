//! Error types for Lethe operations
//!
//! Most engine operations never fail: unknown ids, disabled features and
//! compression failures all degrade to an observable no-op. The variants here
//! cover configuration loading and the monitor lifecycle.

/// Result type for Lethe operations
pub type Result<T> = std::result::Result<T, LetheError>;

/// Error types for the eviction engine
#[derive(Debug, thiserror::Error)]
pub enum LetheError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Compression transform failed
    #[error("Compression error: {0}")]
    Compression(String),

    /// Pressure monitor lifecycle error
    #[error("Monitor error: {0}")]
    Monitor(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for LetheError {
    fn from(s: String) -> Self {
        LetheError::Other(s)
    }
}

impl From<&str> for LetheError {
    fn from(s: &str) -> Self {
        LetheError::Other(s.to_string())
    }
}

impl From<anyhow::Error> for LetheError {
    fn from(err: anyhow::Error) -> Self {
        LetheError::Other(err.to_string())
    }
}

//! Error types for chatrelay

/// Result type alias using chatrelay's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for coordination operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Shared coordination store failures (timeouts, lost connections)
    #[error("store error: {0}")]
    Store(String),

    /// Event bus publish/subscribe failures
    #[error("bus error: {0}")]
    Bus(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a new bus error
    pub fn bus(msg: impl Into<String>) -> Self {
        Self::Bus(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

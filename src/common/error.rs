//! Error types for the application.

use thiserror::Error;

/// Top-level application error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },

    #[error("No configuration found; a default one was written to '{path}', edit it and restart")]
    Bootstrapped { path: String },
}

/// Registration store errors.
///
/// Invalid input and lookup misses are not errors; they surface as `false`
/// and `None` from the store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to open database '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Whether the store can no longer serve any operation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Poisoned)
    }
}

/// Errors talking to the chat platform.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),

    #[error("Failed to build HTTP client: {message}")]
    ClientBuild { message: String },
}

impl TransportError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Request(teloxide::RequestError::Network(_))
                | Self::Request(teloxide::RequestError::RetryAfter(_))
        )
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

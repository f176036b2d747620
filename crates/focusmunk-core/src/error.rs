//! Core error types for focusmunk-core.
//!
//! These errors only surface on user-initiated paths (pairing, settings,
//! free-time controls). The navigation path converts every failure into a
//! sync outcome or a block verdict instead of returning an error.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusmunk-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Remote API errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Local persistence errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An operation needs a paired configuration but none is stored
    #[error("This client is not paired with a configuration")]
    NotPaired,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors returned by the remote configuration server.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport-level failure (DNS, connection refused, TLS...)
    #[error("request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// The request did not complete within the configured timeout
    #[error("request timed out")]
    Timeout,

    /// The server has no configuration with this id
    #[error("configuration not found")]
    NotFound,

    /// Password or setup code rejected
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Any other non-success status
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body was not what the contract promises
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Local state database errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open state database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored row could not be decoded
    #[error("Stored state is corrupt: {0}")]
    Corrupt(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Http(err)
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::QueryFailed(err.to_string())
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

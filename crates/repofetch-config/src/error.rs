//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or persisting credential state.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error.
    #[error("io error at {}: {message}", path.display())]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// JSON parse or render error.
    #[error("json error at {}: {message}", path.display())]
    Json {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },
}

impl ConfigError {
    /// Create an IO error.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create a JSON error.
    #[must_use]
    pub fn json(path: impl Into<PathBuf>, err: &serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

//! Authentication error types.

use thiserror::Error;

/// Errors from the device authorization flow and credential management.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Server response violated the device-flow protocol.
    #[error("device flow protocol error: {message}")]
    Protocol {
        /// What the server got wrong.
        message: String,
    },

    /// HTTP transport failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Credential store failure.
    #[error(transparent)]
    Config(#[from] repofetch_config::ConfigError),

    /// User interaction failed.
    #[error("prompt error: {message}")]
    Prompt {
        /// What went wrong talking to the user.
        message: String,
    },
}

impl AuthError {
    /// Create a protocol error.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a prompt error.
    #[must_use]
    pub fn prompt(message: impl Into<String>) -> Self {
        Self::Prompt {
            message: message.into(),
        }
    }
}

/// Result type for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

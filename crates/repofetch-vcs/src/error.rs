//! VCS error types with rich context for debugging and recovery.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    /// Authentication was rejected (bad or expired token, rejected key).
    Auth,
    /// The host could not be reached (DNS, timeout, connection refused).
    Connectivity,
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth => write!(f, "authentication"),
            Self::Connectivity => write!(f, "connectivity"),
        }
    }
}

/// VCS-specific error types with detailed context.
#[derive(Error, Debug)]
pub enum VcsError {
    /// Repository reference string matched no recognized syntax.
    #[error(
        "unrecognized repository reference '{input}': {reason} \
         (supported: https://host/owner/repo, user@host:owner/repo, owner/repo)"
    )]
    InvalidReference {
        /// The raw input that failed to parse.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Clone or fetch failed at the transport level.
    #[error("{failure} failure for {url}: {reason}")]
    Transport {
        /// Repository URL.
        url: String,
        /// Auth versus connectivity.
        failure: TransportFailure,
        /// Failure detail from git.
        reason: String,
    },

    /// Repository not found upstream.
    #[error("repository not found: {url}")]
    RepositoryNotFound {
        /// Repository URL.
        url: String,
    },

    /// Requested git ref does not exist upstream.
    #[error("reference not found: {reference}")]
    RefNotFound {
        /// Reference that was not found.
        reference: String,
    },

    /// Requested sub-path does not exist in the checked-out tree.
    #[error("sub-path '{sub_path}' not found in repository")]
    SubPathNotFound {
        /// Sub-path that was requested.
        sub_path: String,
    },

    /// Command execution failed.
    #[error("command '{command}' failed: {message}")]
    Command {
        /// Command that failed.
        command: String,
        /// Error message.
        message: String,
    },

    /// IO error.
    #[error("io error at {}: {message}", path.display())]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },
}

impl VcsError {
    /// Create an invalid-reference error.
    #[must_use]
    pub fn invalid_reference(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidReference {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a transport error.
    #[must_use]
    pub fn transport(
        url: impl Into<String>,
        failure: TransportFailure,
        reason: impl Into<String>,
    ) -> Self {
        Self::Transport {
            url: url.into(),
            failure,
            reason: reason.into(),
        }
    }

    /// Create an IO error.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Check if this is an authentication failure.
    #[must_use]
    pub const fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                failure: TransportFailure::Auth,
                ..
            }
        )
    }

    /// Check if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                failure: TransportFailure::Connectivity,
                ..
            }
        )
    }

    /// Check if this is a "not found" error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RepositoryNotFound { .. } | Self::RefNotFound { .. } | Self::SubPathNotFound { .. }
        )
    }
}

/// Result type for VCS operations.
pub type Result<T> = std::result::Result<T, VcsError>;

//! Error types for registry-gateway.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the gateway.
///
/// The type is `Clone` because a pending connection is shared between
/// concurrent callers, and all of them observe the same failure.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Malformed identity input. Raised before any I/O.
    #[error("invalid input: {0}")]
    InputValidation(String),

    /// The outbound call did not finish within its budget.
    #[error("operation {operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// Remote operation name.
        operation: String,
        /// Budget that was exceeded.
        timeout_ms: u64,
    },

    /// The remote endpoint explicitly reported a fault.
    #[error("remote fault: {message}")]
    RemoteFault {
        /// Human-readable fault message.
        message: String,
    },

    /// Transport-level failure (connect, DNS, HTTP status, decode).
    #[error("transport error: {0}")]
    Transport(String),

    /// A payload was received but failed shape validation.
    #[error("response validation failed: {details}")]
    ResponseValidation {
        /// Every offending field, joined.
        details: String,
    },

    /// The response was well formed but carried no usable payload.
    #[error("unexpected response state: {0}")]
    UnexpectedState(String),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Cache or lock backend failure.
    #[error("store error: {0}")]
    Store(String),

    /// The lock for a subject could not be acquired within the wait bound.
    #[error("lock {key} not acquired")]
    LockUnavailable {
        /// Lock key that stayed contended.
        key: String,
    },

    /// I/O error (configuration files).
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Returns `true` when the caller may retry later with the same input.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::RemoteFault { .. }
                | Self::Transport(_)
                | Self::LockUnavailable { .. }
        )
    }

    /// Returns `true` when the failure was caused by the caller's input.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InputValidation(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

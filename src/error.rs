//! Error Types
//!
//! One error enum for the whole crate. Invocation failures inside a call body
//! are *not* represented here: the registry turns those into a failed
//! [`CallOutput`](crate::primitives::CallOutput).

use thiserror::Error;

/// Result alias used by every fallible operation in the crate
pub type CallResult<T> = Result<T, CallError>;

#[derive(Debug, Error)]
pub enum CallError {
    /// The call name is unknown in both the user table and the global table
    #[error("Call '{name}' not found (user: {user})")]
    NotFound { name: String, user: String },

    /// Supplied argument count differs from the declared parameter count
    #[error("Call '{name}' expects {expected} parameters, but invoked with {actual}")]
    ArgumentMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Catalog batch protocol violation (register before start, after end, ...)
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Operation cancelled")]
    Cancelled,

    /// Peer resolution failed for a user
    #[error("Peer unavailable for user {user}: {reason}")]
    PeerUnavailable { user: String, reason: String },

    /// A remote hop failed
    #[error("Transport error during {op}: {reason}")]
    Transport { op: String, reason: String },

    /// Wire document could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CallError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    pub fn transport(op: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            op: op.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is the cooperative cancellation signal
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

//! Error types for connection dispatch failures.

use std::io;

use thiserror::Error;

/// Errors that end the dispatch loop of a connection.
#[derive(Debug, Error)]
pub(crate) enum DispatchError {
    /// A line exceeded the configured size limit.
    #[error("message too large: {size} bytes exceeds {limit} byte limit")]
    MessageTooLarge { size: usize, limit: usize },

    /// Reading from or writing to the connection failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A response frame could not be serialized.
    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl DispatchError {
    pub(crate) const fn message_too_large(size: usize, limit: usize) -> Self {
        Self::MessageTooLarge { size, limit }
    }
}

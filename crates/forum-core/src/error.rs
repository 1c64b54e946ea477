//! # Error Types
//!
//! Errors raised by the wire protocol and by message store backends. Neither
//! kind is ever surfaced to a chat client; the hub logs them and carries on.

use crate::protocol::MessageKind;
use thiserror::Error;

/// Errors produced while decoding or encoding wire frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The frame is not a valid envelope.
    #[error("Malformed frame: {0}")]
    Malformed(String),

    /// The frame decoded, but clients may not send this message kind.
    #[error("Unsupported inbound message kind: {0}")]
    UnsupportedKind(MessageKind),

    /// The frame exceeds the configured size limit.
    #[error("Frame too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },

    /// An outbound envelope could not be serialized.
    #[error("Failed to encode envelope: {0}")]
    Encode(String),
}

/// Errors produced by [`MessageStore`](crate::MessageStore) backends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend failed to execute an operation.
    #[error("{backend} backend error: {reason}")]
    Backend { backend: String, reason: String },

    /// The operation did not finish within its deadline.
    #[error("Store operation timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// A stored row could not be converted into a message.
    #[error("Stored data could not be decoded: {0}")]
    Serialization(String),

    /// The query parameters were rejected.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl StoreError {
    /// Convenience constructor for backend failures.
    pub fn backend(backend: &str, reason: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.to_string(),
            reason: reason.into(),
        }
    }
}

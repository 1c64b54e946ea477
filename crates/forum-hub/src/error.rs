//! Hub error types
//!
//! Only registration can fail from a caller's point of view. Everything that
//! happens after a connection is registered (decode, persistence, transport
//! and queue-full failures) is logged and, at worst, ends that connection.

use forum_core::InvalidIdentity;

/// Hub operation result
pub type HubResult<T> = Result<T, HubError>;

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("Invalid identity: {0}")]
    InvalidIdentity(#[from] InvalidIdentity),

    #[error("Identity '{0}' is already connected")]
    DuplicateLogin(String),
}

//! Session resolution contract.
//!
//! Sessions are created by the forum's login flow. The chat layer only maps
//! a session id presented by a client to the identity behind it.

use async_trait::async_trait;

/// Maps a session id to an authenticated identity.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// The identity for `session_id`, or `None` when the session is unknown,
    /// expired or cannot be looked up.
    async fn resolve(&self, session_id: &str) -> Option<String>;
}

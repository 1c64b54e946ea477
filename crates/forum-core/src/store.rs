//! Message persistence contract.
//!
//! The hub never talks to a database directly. It persists routed messages
//! and reads conversation recency through this trait; implementations must
//! be safe to call concurrently.

use crate::error::StoreError;
use crate::message::ChatMessage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Most recent conversation time per counterpart identity.
pub type ConversationTimestamps = HashMap<String, DateTime<Utc>>;

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist one routed message.
    async fn save(&self, message: &ChatMessage) -> Result<(), StoreError>;

    /// For every identity `identity` has exchanged direct messages with, the
    /// timestamp of the latest message in either direction. Broadcasts are not
    /// conversations and do not appear.
    async fn last_conversation_timestamps(
        &self,
        identity: &str,
    ) -> Result<ConversationTimestamps, StoreError>;

    /// One page of the conversation between `a` and `b`.
    ///
    /// Pages are counted from the most recent message backwards (`offset` 0 is
    /// the newest page); the returned page itself is in chronological order.
    async fn history(
        &self,
        a: &str,
        b: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ChatMessage>, StoreError>;
}

//! In-memory message store.

use async_trait::async_trait;
use forum_core::{ChatMessage, ConversationTimestamps, MessageStore, StoreError};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-local message store backed by a vector.
///
/// Clones share the same underlying messages.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageStore {
    messages: Arc<RwLock<Vec<ChatMessage>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored messages.
    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }

    /// Snapshot of every stored message in insertion order.
    pub async fn all(&self) -> Vec<ChatMessage> {
        self.messages.read().await.clone()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn save(&self, message: &ChatMessage) -> Result<(), StoreError> {
        self.messages.write().await.push(message.clone());
        Ok(())
    }

    async fn last_conversation_timestamps(
        &self,
        identity: &str,
    ) -> Result<ConversationTimestamps, StoreError> {
        let messages = self.messages.read().await;
        Ok(latest_per_counterpart(identity, messages.iter()))
    }

    async fn history(
        &self,
        a: &str,
        b: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let messages = self.messages.read().await;
        Ok(conversation_page(messages.iter(), a, b, limit, offset))
    }
}

/// Max timestamp per direct-message counterpart of `identity`.
pub(crate) fn latest_per_counterpart<'a>(
    identity: &str,
    messages: impl Iterator<Item = &'a ChatMessage>,
) -> ConversationTimestamps {
    let mut latest = ConversationTimestamps::new();
    for message in messages {
        if let Some(other) = message.counterpart(identity) {
            latest
                .entry(other.to_string())
                .and_modify(|ts| {
                    if message.timestamp > *ts {
                        *ts = message.timestamp;
                    }
                })
                .or_insert(message.timestamp);
        }
    }
    latest
}

/// Newest-first page of the `a`/`b` conversation, returned oldest-first.
pub(crate) fn conversation_page<'a>(
    messages: impl Iterator<Item = &'a ChatMessage>,
    a: &str,
    b: &str,
    limit: usize,
    offset: usize,
) -> Vec<ChatMessage> {
    let mut conversation: Vec<&ChatMessage> = messages
        .filter(|m| (m.from == a && m.to == b) || (m.from == b && m.to == a))
        .collect();

    // Stable sort keeps insertion order among equal timestamps.
    conversation.sort_by_key(|m| m.timestamp);

    let mut page: Vec<ChatMessage> = conversation
        .into_iter()
        .rev()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect();
    page.reverse();
    page
}

//! The chat message domain type.

use crate::protocol::BROADCAST_RECIPIENT;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unit of conversation between identities.
///
/// `from` is always the authenticated identity of the sending connection and
/// `timestamp` is assigned by the router on receipt; neither is taken from the
/// client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sender identity
    pub from: String,
    /// Recipient identity, or [`BROADCAST_RECIPIENT`] / empty for everyone
    pub to: String,
    /// Body text
    pub content: String,
    /// Server-assigned receipt time
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a message stamped with the current time.
    pub fn new(from: impl Into<String>, to: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Override the timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Whether this message goes to every live connection.
    pub fn is_broadcast(&self) -> bool {
        self.to.is_empty() || self.to == BROADCAST_RECIPIENT
    }

    /// Whether `identity` took part in this message as sender or recipient.
    pub fn involves(&self, identity: &str) -> bool {
        self.from == identity || self.to == identity
    }

    /// The other participant of a direct message, seen from `identity`.
    pub fn counterpart(&self, identity: &str) -> Option<&str> {
        if self.is_broadcast() {
            return None;
        }
        if self.from == identity {
            Some(&self.to)
        } else if self.to == identity {
            Some(&self.from)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_all_recipients_are_broadcasts() {
        assert!(ChatMessage::new("alice", "", "hi").is_broadcast());
        assert!(ChatMessage::new("alice", "all", "hi").is_broadcast());
        assert!(!ChatMessage::new("alice", "bob", "hi").is_broadcast());
    }

    #[test]
    fn counterpart_is_resolved_from_either_side() {
        let msg = ChatMessage::new("alice", "bob", "hi");
        assert_eq!(msg.counterpart("alice"), Some("bob"));
        assert_eq!(msg.counterpart("bob"), Some("alice"));
        assert_eq!(msg.counterpart("carol"), None);
        assert_eq!(ChatMessage::new("alice", "all", "hi").counterpart("alice"), None);
    }
}

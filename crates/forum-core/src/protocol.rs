//! WebSocket wire protocol definitions
//!
//! Every frame in either direction is one JSON object:
//!
//! ```json
//! { "type": "chat_message", "from": "alice", "to": "bob",
//!   "content": "hi", "timestamp": "2024-01-01T12:00:00Z" }
//! ```
//!
//! Presence frames additionally carry `"online_users": [...]`.

use crate::error::ProtocolError;
use crate::message::ChatMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recipient sentinel addressing every live connection.
pub const BROADCAST_RECIPIENT: &str = "all";

/// Sender used for hub-generated presence events.
pub const SYSTEM_SENDER: &str = "system";

/// Type-safe message kinds carried in the `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Conversation message, direct or broadcast
    ChatMessage,
    /// Another identity came online
    UserJoined,
    /// Another identity went offline
    UserLeft,
    /// Conversation ordering changed after a direct message
    OnlineUsersUpdate,
    /// First presence view sent to a freshly registered connection
    InitialOnlineUsers,
}

impl MessageKind {
    /// Get the canonical wire name for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChatMessage => "chat_message",
            Self::UserJoined => "user_joined",
            Self::UserLeft => "user_left",
            Self::OnlineUsersUpdate => "online_users_update",
            Self::InitialOnlineUsers => "initial_online_users",
        }
    }

    /// Whether this kind carries an `online_users` list
    pub fn is_presence(&self) -> bool {
        !matches!(self, Self::ChatMessage)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound frame as serialized to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_users: Option<Vec<String>>,
}

impl Envelope {
    /// Wrap a routed chat message.
    pub fn chat(message: &ChatMessage) -> Self {
        Self {
            kind: MessageKind::ChatMessage,
            from: message.from.clone(),
            to: message.to.clone(),
            content: message.content.clone(),
            timestamp: message.timestamp,
            online_users: None,
        }
    }

    /// `user_joined` / `user_left` event about `subject`, carrying the
    /// observer's personalized view.
    pub fn membership(kind: MessageKind, subject: &str, online_users: Vec<String>) -> Self {
        Self {
            kind,
            from: SYSTEM_SENDER.to_string(),
            to: BROADCAST_RECIPIENT.to_string(),
            content: subject.to_string(),
            timestamp: Utc::now(),
            online_users: Some(online_users),
        }
    }

    /// `initial_online_users` / `online_users_update` addressed to one observer.
    pub fn presence_view(kind: MessageKind, observer: &str, online_users: Vec<String>) -> Self {
        Self {
            kind,
            from: SYSTEM_SENDER.to_string(),
            to: observer.to_string(),
            content: String::new(),
            timestamp: Utc::now(),
            online_users: Some(online_users),
        }
    }

    /// Serialize to the JSON text sent over the wire.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }
}

/// Inbound frame as accepted from clients.
///
/// Only the routing fields are read; a client-supplied `from` or `timestamp`
/// is ignored because the hub overwrites both.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InboundFrame {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub content: String,
}

impl InboundFrame {
    /// Decode and validate a text frame.
    ///
    /// Frames larger than `max_size` and frames of any kind other than
    /// `chat_message` are rejected.
    pub fn decode(text: &str, max_size: usize) -> Result<Self, ProtocolError> {
        if text.len() > max_size {
            return Err(ProtocolError::TooLarge {
                size: text.len(),
                max: max_size,
            });
        }

        let frame: InboundFrame =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

        if frame.kind != MessageKind::ChatMessage {
            return Err(ProtocolError::UnsupportedKind(frame.kind));
        }

        Ok(frame)
    }

    /// Bind the frame to its authenticated sender.
    pub fn into_message(self, sender: &str) -> ChatMessage {
        ChatMessage::new(sender, self.to, self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 64 * 1024;

    #[test]
    fn test_kind_wire_names() {
        let json = serde_json::to_string(&MessageKind::InitialOnlineUsers).unwrap();
        assert_eq!(json, "\"initial_online_users\"");
        assert_eq!(MessageKind::OnlineUsersUpdate.to_string(), "online_users_update");
        assert!(!MessageKind::ChatMessage.is_presence());
        assert!(MessageKind::UserLeft.is_presence());
    }

    #[test]
    fn test_decode_ignores_client_sender_and_timestamp() {
        let text = r#"{"type":"chat_message","from":"mallory","to":"bob","content":"hi","timestamp":"not a date"}"#;
        let frame = InboundFrame::decode(text, MAX).unwrap();
        let msg = frame.into_message("alice");
        assert_eq!(msg.from, "alice");
        assert_eq!(msg.to, "bob");
        assert_eq!(msg.content, "hi");
    }

    #[test]
    fn test_decode_defaults_missing_recipient_to_broadcast() {
        let frame = InboundFrame::decode(r#"{"type":"chat_message","content":"hello"}"#, MAX).unwrap();
        assert!(frame.into_message("alice").is_broadcast());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            InboundFrame::decode("{not json", MAX),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            InboundFrame::decode(r#"{"type":"shout","content":"x"}"#, MAX),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_rejects_forged_presence() {
        let text = r#"{"type":"user_left","to":"all","content":"bob"}"#;
        assert_eq!(
            InboundFrame::decode(text, MAX),
            Err(ProtocolError::UnsupportedKind(MessageKind::UserLeft))
        );
    }

    #[test]
    fn test_decode_rejects_oversized_frames() {
        let text = format!(r#"{{"type":"chat_message","content":"{}"}}"#, "x".repeat(200));
        assert!(matches!(
            InboundFrame::decode(&text, 100),
            Err(ProtocolError::TooLarge { max: 100, .. })
        ));
    }

    #[test]
    fn test_presence_envelope_serialization() {
        let env = Envelope::membership(MessageKind::UserJoined, "bob", vec!["bob".into()]);
        let json: serde_json::Value = serde_json::from_str(&env.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "user_joined");
        assert_eq!(json["from"], "system");
        assert_eq!(json["to"], "all");
        assert_eq!(json["content"], "bob");
        assert_eq!(json["online_users"], serde_json::json!(["bob"]));
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_chat_envelope_omits_online_users() {
        let msg = ChatMessage::new("alice", "bob", "hi");
        let json = Envelope::chat(&msg).to_json().unwrap();
        assert!(json.contains("\"type\":\"chat_message\""));
        assert!(!json.contains("online_users"));
    }
}

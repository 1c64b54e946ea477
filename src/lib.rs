//! # Forum Chat
//!
//! Real-time chat layer of the forum backend.
//!
//! - [`core`]: wire protocol, chat messages, the message store contract
//! - [`store`]: in-memory and SQLite message stores
//! - [`hub`]: connection registry, routing, presence and the HTTP surface

pub use forum_core as core;
pub use forum_hub as hub;
pub use forum_store as store;

pub use forum_core::{ChatMessage, Envelope, MessageKind, MessageStore};
pub use forum_hub::{DuplicateLoginPolicy, Hub, HubConfig, HubError, Session};
pub use forum_store::InMemoryMessageStore;
#[cfg(feature = "sqlite")]
pub use forum_store::SqliteMessageStore;

//! # Forum Core
//!
//! Shared types for the forum chat hub. This crate carries no runtime of its
//! own: it defines the JSON envelope exchanged over WebSocket connections,
//! the [`ChatMessage`] domain type, identity validation, the
//! [`MessageStore`] contract the hub persists through, and the
//! [`IdentityResolver`] contract it authenticates connections through.

pub mod error;
pub mod identity;
pub mod message;
pub mod protocol;
pub mod session;
pub mod store;

pub use error::{ProtocolError, StoreError};
pub use identity::{InvalidIdentity, validate_identity};
pub use message::ChatMessage;
pub use protocol::{BROADCAST_RECIPIENT, Envelope, InboundFrame, MessageKind, SYSTEM_SENDER};
pub use session::IdentityResolver;
pub use store::{ConversationTimestamps, MessageStore};

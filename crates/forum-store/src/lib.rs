//! # Forum Store
//!
//! [`MessageStore`](forum_core::MessageStore) backends for the chat hub.
//!
//! - [`InMemoryMessageStore`]: process-local, always available
//! - [`SqliteMessageStore`]: durable SQLite storage (feature `sqlite`)
//! - [`SqliteSessionResolver`]: login sessions read from the same database

pub mod in_memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryMessageStore;
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteMessageStore, SqliteSessionResolver};

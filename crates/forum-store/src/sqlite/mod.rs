//! SQLite-backed message store
//!
//! A single connection guarded by a mutex; every call runs on the blocking
//! thread pool so the async runtime never waits on disk I/O.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use forum_core::{ChatMessage, ConversationTimestamps, MessageStore, StoreError};
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

pub mod migration;
pub mod sessions;

pub use migration::{Migration, MigrationEngine};
pub use sessions::SqliteSessionResolver;

const BACKEND: &str = "sqlite";

/// Durable message store over SQLite.
#[derive(Clone)]
pub struct SqliteMessageStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteMessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteMessageStore")
            .field("path", &self.path)
            .finish()
    }
}

impl SqliteMessageStore {
    /// Open (creating if needed) the database at `path` and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(backend_error)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(|e| StoreError::backend(BACKEND, format!("Failed to configure SQLite: {e}")))?;

        Self::with_connection(conn, Some(path))
    }

    /// Private in-memory database, mainly for tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(backend_error)?;
        Self::with_connection(conn, None)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self, StoreError> {
        MigrationEngine::new().migrate(&conn)?;
        debug!(path = ?path, "Opened SQLite message store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// Run `op` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| StoreError::backend(BACKEND, format!("Connection lock poisoned: {e}")))?;
            op(&guard)
        })
        .await
        .map_err(|e| StoreError::backend(BACKEND, format!("Blocking task failed: {e}")))?
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn save(&self, message: &ChatMessage) -> Result<(), StoreError> {
        let message = message.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO messages (from_user, to_user, body, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    message.from,
                    message.to,
                    message.content,
                    encode_timestamp(&message.timestamp)
                ],
            )
            .map_err(backend_error)?;
            Ok(())
        })
        .await
    }

    async fn last_conversation_timestamps(
        &self,
        identity: &str,
    ) -> Result<ConversationTimestamps, StoreError> {
        let identity = identity.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT CASE WHEN from_user = ?1 THEN to_user ELSE from_user END AS counterpart,
                            MAX(created_at)
                     FROM messages
                     WHERE (from_user = ?1 OR to_user = ?1)
                       AND to_user NOT IN ('all', '')
                     GROUP BY counterpart",
                )
                .map_err(backend_error)?;

            let rows = stmt
                .query_map(params![identity], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(backend_error)?;

            let mut latest = ConversationTimestamps::new();
            for row in rows {
                let (counterpart, created_at) = row.map_err(backend_error)?;
                latest.insert(counterpart, decode_timestamp(&created_at)?);
            }
            Ok(latest)
        })
        .await
    }

    async fn history(
        &self,
        a: &str,
        b: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let limit = i64::try_from(limit)
            .map_err(|_| StoreError::InvalidQuery(format!("limit {limit} out of range")))?;
        let offset = i64::try_from(offset)
            .map_err(|_| StoreError::InvalidQuery(format!("offset {offset} out of range")))?;
        let (a, b) = (a.to_string(), b.to_string());

        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT from_user, to_user, body, created_at
                     FROM messages
                     WHERE (from_user = ?1 AND to_user = ?2)
                        OR (from_user = ?2 AND to_user = ?1)
                     ORDER BY created_at DESC, id DESC
                     LIMIT ?3 OFFSET ?4",
                )
                .map_err(backend_error)?;

            let rows = stmt
                .query_map(params![a, b, limit, offset], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })
                .map_err(backend_error)?;

            let mut page = Vec::new();
            for row in rows {
                let (from, to, content, created_at) = row.map_err(backend_error)?;
                page.push(ChatMessage {
                    from,
                    to,
                    content,
                    timestamp: decode_timestamp(&created_at)?,
                });
            }
            page.reverse();
            Ok(page)
        })
        .await
    }
}

fn backend_error(e: rusqlite::Error) -> StoreError {
    StoreError::backend(BACKEND, e.to_string())
}

// Fixed-width UTC text so lexical order in SQL matches chronological order.
fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("bad created_at '{raw}': {e}")))
}

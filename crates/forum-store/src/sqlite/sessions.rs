//! Session lookups against the forum database
//!
//! The forum's login flow owns the `users` and `sessions` tables; this module
//! only reads them. A session resolves to the nickname of its user while
//! `expires_at` lies in the future.

use super::{BACKEND, SqliteMessageStore, backend_error};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use forum_core::{IdentityResolver, StoreError, validate_identity};
use rusqlite::{OptionalExtension, params};
use tracing::{debug, warn};

/// [`IdentityResolver`] over the forum's session table.
///
/// Shares the connection of the message store it was created from.
#[derive(Debug, Clone)]
pub struct SqliteSessionResolver {
    store: SqliteMessageStore,
}

impl SqliteSessionResolver {
    pub fn new(store: &SqliteMessageStore) -> Self {
        Self {
            store: store.clone(),
        }
    }

    /// Nickname behind a live session, `None` if unknown or expired.
    pub async fn identity_for(&self, session_id: &str) -> Result<Option<String>, StoreError> {
        let session_id = session_id.to_string();
        self.store
            .with_conn(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT u.nickname, s.expires_at
                         FROM sessions s
                         JOIN users u ON u.id = s.user_id
                         WHERE s.session_id = ?1",
                        params![session_id],
                        |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                    )
                    .optional()
                    .map_err(backend_error)?;

                let Some((nickname, expires_at)) = row else {
                    return Ok(None);
                };
                if decode_expiry(&expires_at)? <= Utc::now() {
                    debug!("Session expired");
                    return Ok(None);
                }
                Ok(Some(nickname))
            })
            .await
    }
}

#[async_trait]
impl IdentityResolver for SqliteSessionResolver {
    async fn resolve(&self, session_id: &str) -> Option<String> {
        let identity = match self.identity_for(session_id).await {
            Ok(identity) => identity?,
            Err(e) => {
                warn!(backend = BACKEND, error = %e, "Session lookup failed");
                return None;
            }
        };

        match validate_identity(&identity) {
            Ok(()) => Some(identity),
            Err(e) => {
                warn!(error = %e, "Session user cannot chat under this nickname");
                None
            }
        }
    }
}

// The login flow writes either RFC 3339 or SQLite's space-separated form,
// with or without an offset.
fn decode_expiry(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|ts| ts.and_utc())
        .map_err(|e| StoreError::Serialization(format!("bad expires_at '{raw}': {e}")))
}

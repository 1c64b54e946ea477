//! SQLite schema migrations
//!
//! Migrations are versioned and recorded in `schema_migrations`; each one is
//! applied in its own transaction.

use forum_core::StoreError;
use rusqlite::{Connection, params};
use tracing::info;

/// Individual migration definition
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: &'static str,
}

/// Migration engine for the chat message schema
pub struct MigrationEngine {
    migrations: Vec<Migration>,
}

impl Default for MigrationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationEngine {
    pub fn new() -> Self {
        Self {
            migrations: Self::default_migrations(),
        }
    }

    fn default_migrations() -> Vec<Migration> {
        vec![
            Migration {
                version: 1,
                description: "Create messages table",
                up: r#"
                    CREATE TABLE IF NOT EXISTS messages (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        from_user TEXT NOT NULL,
                        to_user TEXT NOT NULL,
                        body TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    );
                "#,
            },
            Migration {
                version: 2,
                description: "Index conversations by participants and time",
                up: r#"
                    CREATE INDEX IF NOT EXISTS idx_messages_conversation
                        ON messages(from_user, to_user, created_at);
                    CREATE INDEX IF NOT EXISTS idx_messages_recipient
                        ON messages(to_user, created_at);
                "#,
            },
        ]
    }

    /// Latest version known to this engine.
    pub fn latest_version(&self) -> u32 {
        self.migrations.iter().map(|m| m.version).max().unwrap_or(0)
    }

    /// Currently applied schema version (0 for a fresh database).
    pub fn current_version(&self, conn: &Connection) -> Result<u32, StoreError> {
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| StoreError::backend("sqlite", format!("Failed to read schema version: {e}")))
    }

    /// Apply every pending migration.
    pub fn migrate(&self, conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            )",
            [],
        )
        .map_err(|e| {
            StoreError::backend("sqlite", format!("Failed to create migrations table: {e}"))
        })?;

        let current = self.current_version(conn)?;
        for migration in self.migrations.iter().filter(|m| m.version > current) {
            self.apply(conn, migration)?;
        }
        Ok(())
    }

    fn apply(&self, conn: &Connection, migration: &Migration) -> Result<(), StoreError> {
        let tx = conn.unchecked_transaction().map_err(|e| {
            StoreError::backend("sqlite", format!("Failed to start migration transaction: {e}"))
        })?;

        tx.execute_batch(migration.up).map_err(|e| {
            StoreError::backend("sqlite", format!("Migration {} failed: {e}", migration.version))
        })?;

        tx.execute(
            "INSERT INTO schema_migrations (version, description) VALUES (?1, ?2)",
            params![migration.version, migration.description],
        )
        .map_err(|e| {
            StoreError::backend(
                "sqlite",
                format!("Failed to record migration {}: {e}", migration.version),
            )
        })?;

        tx.commit().map_err(|e| {
            StoreError::backend(
                "sqlite",
                format!("Failed to commit migration {}: {e}", migration.version),
            )
        })?;

        info!(
            version = migration.version,
            description = migration.description,
            "Applied message store migration"
        );
        Ok(())
    }
}

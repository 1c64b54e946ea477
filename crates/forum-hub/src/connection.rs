//! Per-connection types

use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique id of one live connection.
///
/// Identities are the addressing key; the id tells apart successive
/// connections of the same identity so a stale connection cannot unregister
/// its replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered connection as handed to its pumps.
///
/// The registry keeps the only sender for `outbound`; once the connection is
/// unregistered or evicted, `outbound` yields `None`.
#[derive(Debug)]
pub struct Session {
    pub id: ConnectionId,
    pub identity: String,
    pub outbound: mpsc::Receiver<String>,
}

/// Registry-side state of a live connection.
#[derive(Debug)]
pub(crate) struct LiveConnection {
    pub identity: String,
    pub sender: mpsc::Sender<String>,
    pub connected_at: Instant,
}

impl LiveConnection {
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

//! Connection registry
//!
//! The live-connection set and the identity index share one lock, so every
//! check-then-act sequence (duplicate detection, queue-full removal, membership
//! check before unregister) is atomic. Only `register`, `unregister` and the
//! queue-full path of the send operations mutate the state.

use crate::config::DuplicateLoginPolicy;
use crate::connection::{ConnectionId, LiveConnection, Session};
use crate::error::{HubError, HubResult};
use std::{collections::HashMap, sync::Arc, time::Instant};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

/// Outcome of a unicast send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Frame queued on the target connection
    Queued,
    /// No connection for the identity; frame dropped
    Offline,
    /// Target queue was full; the connection was removed and its queue closed
    Disconnected,
}

/// Outcome of a broadcast
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the frame was queued on
    pub delivered: usize,
    /// Identities removed because their queue was full
    pub disconnected: Vec<String>,
}

/// Outcome of a successful registration
#[derive(Debug)]
pub struct Registration {
    pub session: Session,
    /// Connection displaced under [`DuplicateLoginPolicy::ReplaceExisting`]
    pub evicted: Option<ConnectionId>,
}

#[derive(Debug, Default)]
struct RegistryState {
    connections: HashMap<ConnectionId, LiveConnection>,
    by_identity: HashMap<String, ConnectionId>,
}

impl RegistryState {
    /// Drop a connection from both structures. Dropping the entry drops the
    /// queue's only sender, which closes the queue.
    fn remove(&mut self, id: ConnectionId) -> Option<LiveConnection> {
        let conn = self.connections.remove(&id)?;
        if self.by_identity.get(&conn.identity) == Some(&id) {
            self.by_identity.remove(&conn.identity);
        }
        Some(conn)
    }

    fn try_send(&mut self, id: ConnectionId, payload: String) -> Delivery {
        let Some(conn) = self.connections.get(&id) else {
            return Delivery::Offline;
        };

        match conn.sender.try_send(payload) {
            Ok(()) => Delivery::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                if let Some(conn) = self.remove(id) {
                    warn!(
                        identity = %conn.identity,
                        conn_id = %id,
                        "Outbound queue full, disconnecting slow consumer"
                    );
                }
                Delivery::Disconnected
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                // Pump already gone; treat like a dead consumer.
                if let Some(conn) = self.remove(id) {
                    debug!(identity = %conn.identity, conn_id = %id, "Outbound queue closed");
                }
                Delivery::Disconnected
            }
        }
    }
}

/// Registry of live connections keyed by identity
#[derive(Debug, Clone)]
pub struct Registry {
    state: Arc<RwLock<RegistryState>>,
    queue_capacity: usize,
}

impl Registry {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(RegistryState::default())),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register a connection for `identity` and create its bounded outbound
    /// queue.
    pub async fn register(
        &self,
        identity: &str,
        policy: DuplicateLoginPolicy,
    ) -> HubResult<Registration> {
        let mut state = self.state.write().await;

        let evicted = match state.by_identity.get(identity).copied() {
            Some(_) if policy == DuplicateLoginPolicy::RejectNew => {
                return Err(HubError::DuplicateLogin(identity.to_string()));
            }
            Some(previous) => {
                state.remove(previous);
                info!(identity = %identity, conn_id = %previous, "Evicted previous connection");
                Some(previous)
            }
            None => None,
        };

        let id = ConnectionId::new();
        let (sender, outbound) = mpsc::channel(self.queue_capacity);
        state.connections.insert(
            id,
            LiveConnection {
                identity: identity.to_string(),
                sender,
                connected_at: Instant::now(),
            },
        );
        state.by_identity.insert(identity.to_string(), id);
        drop(state);

        info!(identity = %identity, conn_id = %id, "Connection registered");
        Ok(Registration {
            session: Session {
                id,
                identity: identity.to_string(),
                outbound,
            },
            evicted,
        })
    }

    /// Remove a connection. Returns its identity if it was still registered;
    /// repeated calls are no-ops.
    pub async fn unregister(&self, id: ConnectionId) -> Option<String> {
        let removed = self.state.write().await.remove(id);

        match removed {
            Some(conn) => {
                info!(
                    identity = %conn.identity,
                    conn_id = %id,
                    duration = %humantime::format_duration(conn.age()),
                    "Connection unregistered"
                );
                Some(conn.identity)
            }
            None => {
                debug!(conn_id = %id, "Unregister of unknown connection ignored");
                None
            }
        }
    }

    /// Queue `payload` for the connection of `identity`.
    pub async fn send_to_identity(&self, identity: &str, payload: String) -> Delivery {
        let mut state = self.state.write().await;
        match state.by_identity.get(identity).copied() {
            Some(id) => state.try_send(id, payload),
            None => Delivery::Offline,
        }
    }

    /// Queue `payload` on every live connection.
    pub async fn broadcast(&self, payload: &str) -> BroadcastReport {
        let mut state = self.state.write().await;
        let ids: Vec<ConnectionId> = state.connections.keys().copied().collect();

        let mut report = BroadcastReport::default();
        for id in ids {
            let identity = state.connections.get(&id).map(|c| c.identity.clone());
            match state.try_send(id, payload.to_string()) {
                Delivery::Queued => report.delivered += 1,
                Delivery::Disconnected => report.disconnected.extend(identity),
                Delivery::Offline => {}
            }
        }
        report
    }

    /// Online identities other than `excluding`, in no particular order.
    pub async fn online_identities_excluding(&self, excluding: &str) -> Vec<String> {
        self.state
            .read()
            .await
            .by_identity
            .keys()
            .filter(|identity| identity.as_str() != excluding)
            .cloned()
            .collect()
    }

    /// All online identities, alphabetical.
    pub async fn online_identities(&self) -> Vec<String> {
        let mut identities: Vec<String> =
            self.state.read().await.by_identity.keys().cloned().collect();
        identities.sort();
        identities
    }

    pub async fn is_online(&self, identity: &str) -> bool {
        self.state.read().await.by_identity.contains_key(identity)
    }

    /// Whether this exact connection is still registered.
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.state.read().await.connections.contains_key(&id)
    }

    /// Number of live connections.
    pub async fn len(&self) -> usize {
        self.state.read().await.connections.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Cross-check the set against the identity index.
    #[doc(hidden)]
    pub async fn is_consistent(&self) -> bool {
        let state = self.state.read().await;
        state.connections.len() == state.by_identity.len()
            && state.by_identity.iter().all(|(identity, id)| {
                state
                    .connections
                    .get(id)
                    .is_some_and(|conn| &conn.identity == identity && !conn.sender.is_closed())
            })
    }
}

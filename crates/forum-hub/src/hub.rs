//! Hub handle
//!
//! [`Hub`] owns the registry and wires the router, presence notifier and
//! sorter around it. It is cheap to clone; every clone shares the same
//! state, so one instance is created per process and handed to the HTTP
//! layer and the pumps.

use crate::config::HubConfig;
use crate::connection::{ConnectionId, Session};
use crate::error::HubResult;
use crate::presence::PresenceNotifier;
use crate::registry::Registry;
use crate::router::{FollowUp, MessageRouter, RouteOutcome};
use crate::sorter::RecencySorter;
use forum_core::{ChatMessage, MessageStore, StoreError, validate_identity};
use std::sync::Arc;
use tracing::{debug, error, info};

struct HubInner {
    config: HubConfig,
    registry: Registry,
    router: MessageRouter,
    presence: PresenceNotifier,
    store: Arc<dyn MessageStore>,
}

/// Shared handle to the chat hub
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Hub {
    pub fn new(config: HubConfig, store: Arc<dyn MessageStore>) -> Self {
        let registry = Registry::new(config.outbound_queue_capacity);
        let sorter = RecencySorter::new(Arc::clone(&store), config.sort_timeout);
        let presence = PresenceNotifier::new(registry.clone(), sorter);
        let router = MessageRouter::new(
            registry.clone(),
            presence.clone(),
            Arc::clone(&store),
            config.persist_timeout,
        );

        Self {
            inner: Arc::new(HubInner {
                config,
                registry,
                router,
                presence,
                store,
            }),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Register a connection for an authenticated identity and announce it.
    ///
    /// The returned session's queue already holds `initial_online_users`.
    pub async fn connect(&self, identity: &str) -> HubResult<Session> {
        validate_identity(identity)?;

        let registration = self
            .inner
            .registry
            .register(identity, self.inner.config.duplicate_login)
            .await?;

        if let Some(previous) = registration.evicted {
            info!(identity = %identity, previous = %previous, "Duplicate login replaced previous connection");
        }

        let gone = self.inner.presence.on_join(identity).await;
        self.settle(gone).await;
        Ok(registration.session)
    }

    /// Unregister a connection and announce the departure.
    ///
    /// Returns `false` if the connection was already gone, in which case no
    /// presence event is sent.
    pub async fn disconnect(&self, id: ConnectionId) -> bool {
        let Some(identity) = self.inner.registry.unregister(id).await else {
            return false;
        };

        // A replacement connection may already hold the identity.
        if self.inner.registry.is_online(&identity).await {
            return true;
        }

        let gone = self.inner.presence.on_leave(&identity).await;
        self.settle(gone).await;
        true
    }

    /// Route a message whose sender has been authenticated by the caller.
    ///
    /// Returns once the message is queued for its recipients. The outcome's
    /// `follow_up` completes after persistence and the participants'
    /// presence refresh, including any removals that refresh caused.
    pub async fn route(&self, message: ChatMessage) -> RouteOutcome {
        let RouteOutcome {
            delivered,
            disconnected,
            follow_up,
        } = self.inner.router.route(message).await;
        self.settle(disconnected.clone()).await;

        let hub = self.clone();
        let follow_up = tokio::spawn(async move {
            let done = match follow_up.await {
                Ok(done) => done,
                Err(e) => {
                    error!(error = %e, "Route follow-up task failed");
                    FollowUp::default()
                }
            };
            hub.settle(done.disconnected.clone()).await;
            done
        });

        RouteOutcome {
            delivered,
            disconnected,
            follow_up,
        }
    }

    /// Every online identity, alphabetical.
    pub async fn online_identities(&self) -> Vec<String> {
        self.inner.registry.online_identities().await
    }

    /// The recency-sorted view `identity` would be pushed.
    pub async fn presence_view(&self, identity: &str) -> Vec<String> {
        self.inner.presence.view_for(identity).await
    }

    pub async fn is_online(&self, identity: &str) -> bool {
        self.inner.registry.is_online(identity).await
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.registry.len().await
    }

    /// One page of the conversation between `a` and `b`, chronological.
    pub async fn history(
        &self,
        a: &str,
        b: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        self.inner.store.history(a, b, limit, offset).await
    }

    /// Announce identities force-removed for a full queue. Announcing can
    /// itself overflow further queues, so this loops until quiet.
    async fn settle(&self, mut gone: Vec<String>) {
        while let Some(identity) = gone.pop() {
            if self.inner.registry.is_online(&identity).await {
                continue;
            }
            debug!(identity = %identity, "Announcing forced disconnect");
            gone.extend(self.inner.presence.on_leave(&identity).await);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DuplicateLoginPolicy;
    use crate::error::HubError;
    use forum_core::{Envelope, MessageKind};
    use forum_store::InMemoryMessageStore;

    fn hub() -> Hub {
        Hub::new(HubConfig::default(), Arc::new(InMemoryMessageStore::new()))
    }

    fn drain(session: &mut Session) -> Vec<Envelope> {
        let mut frames = Vec::new();
        while let Ok(text) = session.outbound.try_recv() {
            frames.push(serde_json::from_str(&text).unwrap());
        }
        frames
    }

    #[tokio::test]
    async fn test_connect_sends_initial_view_and_announces() {
        let hub = hub();
        let mut alice = hub.connect("alice").await.unwrap();
        let initial = drain(&mut alice);
        assert_eq!(initial.len(), 1);
        assert_eq!(initial[0].kind, MessageKind::InitialOnlineUsers);
        assert_eq!(initial[0].online_users, Some(Vec::new()));

        let mut bob = hub.connect("bob").await.unwrap();
        let joined = drain(&mut alice);
        assert_eq!(joined[0].kind, MessageKind::UserJoined);
        assert_eq!(joined[0].content, "bob");
        assert_eq!(joined[0].online_users, Some(vec!["bob".to_string()]));

        let initial = drain(&mut bob);
        assert_eq!(initial[0].online_users, Some(vec!["alice".to_string()]));
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_identity() {
        let hub = hub();
        assert!(matches!(
            hub.connect("").await,
            Err(HubError::InvalidIdentity(_))
        ));
        assert!(matches!(
            hub.connect("system").await,
            Err(HubError::InvalidIdentity(_))
        ));
    }

    #[tokio::test]
    async fn test_double_disconnect_announces_once() {
        let hub = hub();
        let mut alice = hub.connect("alice").await.unwrap();
        let bob = hub.connect("bob").await.unwrap();
        drain(&mut alice);

        assert!(hub.disconnect(bob.id).await);
        assert!(!hub.disconnect(bob.id).await);

        let left: Vec<_> = drain(&mut alice)
            .into_iter()
            .filter(|e| e.kind == MessageKind::UserLeft)
            .collect();
        assert_eq!(left.len(), 1);
        assert_eq!(hub.online_identities().await, vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_login_replaces_without_leave_event() {
        let hub = hub();
        let mut observer = hub.connect("observer").await.unwrap();
        let mut first = hub.connect("alice").await.unwrap();
        let _second = hub.connect("alice").await.unwrap();
        drain(&mut first);
        assert_eq!(first.outbound.recv().await, None);

        // Stale pump cleanup must not take the new connection offline.
        assert!(!hub.disconnect(first.id).await);
        assert!(hub.is_online("alice").await);
        assert_eq!(hub.connection_count().await, 2);

        let kinds: Vec<_> = drain(&mut observer).into_iter().map(|e| e.kind).collect();
        assert!(!kinds.contains(&MessageKind::UserLeft));
    }

    #[tokio::test]
    async fn test_reject_new_policy_keeps_first_connection() {
        let config = HubConfig::builder()
            .duplicate_login(DuplicateLoginPolicy::RejectNew)
            .build();
        let hub = Hub::new(config, Arc::new(InMemoryMessageStore::new()));

        let _first = hub.connect("alice").await.unwrap();
        assert!(matches!(
            hub.connect("alice").await,
            Err(HubError::DuplicateLogin(_))
        ));
        assert_eq!(hub.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_slow_consumer_is_removed_and_announced() {
        let config = HubConfig::builder()
            .outbound_queue_capacity(2)
            .unwrap()
            .build();
        let hub = Hub::new(config, Arc::new(InMemoryMessageStore::new()));

        // Never drained: initial view plus one join fill the queue.
        let _slow = hub.connect("slow").await.unwrap();
        let mut alice = hub.connect("alice").await.unwrap();
        drain(&mut alice);

        hub.route(ChatMessage::new("alice", "all", "one")).await;
        assert!(!hub.is_online("slow").await);

        let frames = drain(&mut alice);
        assert_eq!(frames[0].kind, MessageKind::ChatMessage);
        assert!(
            frames
                .iter()
                .any(|e| e.kind == MessageKind::UserLeft && e.content == "slow")
        );

        let outcome = hub.route(ChatMessage::new("alice", "slow", "hello?")).await;
        assert_eq!(outcome.delivered, 1);
    }

    #[tokio::test]
    async fn test_history_passthrough() {
        let hub = hub();
        let _alice = hub.connect("alice").await.unwrap();
        for body in ["first", "second"] {
            let outcome = hub.route(ChatMessage::new("alice", "bob", body)).await;
            assert!(outcome.follow_up.await.unwrap().persisted);
        }

        let page = hub.history("bob", "alice", 10, 0).await.unwrap();
        let bodies: Vec<_> = page.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(bodies, ["first", "second"]);
    }
}

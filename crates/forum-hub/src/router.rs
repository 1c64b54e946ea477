//! Message router
//!
//! Stamps, delivers and persists one chat message. Routing returns as soon
//! as the message is queued for its recipients. Persistence runs on its own
//! task under an independent deadline, and its failure never affects
//! delivery. For direct messages the participants' presence refresh follows
//! persistence on that task so the new conversation shows in their ordering.

use crate::presence::PresenceNotifier;
use crate::registry::{Delivery, Registry};
use chrono::Utc;
use forum_core::{ChatMessage, Envelope, MessageStore, StoreError};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// What happened to one routed message
#[derive(Debug)]
pub struct RouteOutcome {
    /// Frames queued, echo included
    pub delivered: usize,
    /// Identities removed because their queue was full
    pub disconnected: Vec<String>,
    /// Persistence and presence refresh, still running when routing returns
    pub follow_up: JoinHandle<FollowUp>,
}

/// Result of the work that runs after delivery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowUp {
    /// Whether the store accepted the message in time
    pub persisted: bool,
    /// Identities removed while refreshing presence
    pub disconnected: Vec<String>,
}

#[derive(Clone)]
pub struct MessageRouter {
    registry: Registry,
    presence: PresenceNotifier,
    store: Arc<dyn MessageStore>,
    persist_timeout: Duration,
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("persist_timeout", &self.persist_timeout)
            .finish_non_exhaustive()
    }
}

impl MessageRouter {
    pub fn new(
        registry: Registry,
        presence: PresenceNotifier,
        store: Arc<dyn MessageStore>,
        persist_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            presence,
            store,
            persist_timeout,
        }
    }

    /// Route `message` from its (already authenticated) sender.
    pub async fn route(&self, mut message: ChatMessage) -> RouteOutcome {
        message.timestamp = Utc::now();

        let persistence = self.spawn_persist(message.clone());
        let mut delivered = 0;
        let mut disconnected = Vec::new();

        match Envelope::chat(&message).to_json() {
            Ok(payload) => {
                self.deliver(&message, payload, &mut delivered, &mut disconnected)
                    .await
            }
            Err(e) => error!(from = %message.from, error = %e, "Failed to encode chat message"),
        }

        debug!(
            from = %message.from,
            to = %message.to,
            delivered,
            "Message delivered"
        );

        let follow_up = tokio::spawn(follow_up(self.presence.clone(), message, persistence));
        RouteOutcome {
            delivered,
            disconnected,
            follow_up,
        }
    }

    fn spawn_persist(&self, message: ChatMessage) -> JoinHandle<Result<(), StoreError>> {
        let store = Arc::clone(&self.store);
        let deadline = self.persist_timeout;

        tokio::spawn(async move {
            match tokio::time::timeout(deadline, store.save(&message)).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout {
                    millis: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
                }),
            }
        })
    }

    async fn deliver(
        &self,
        message: &ChatMessage,
        payload: String,
        delivered: &mut usize,
        disconnected: &mut Vec<String>,
    ) {
        if message.is_broadcast() {
            let report = self.registry.broadcast(&payload).await;
            *delivered += report.delivered;
            disconnected.extend(report.disconnected);
            return;
        }

        let mut targets = vec![message.to.as_str()];
        if message.from != message.to {
            targets.push(message.from.as_str());
        }

        for target in targets {
            match self.registry.send_to_identity(target, payload.clone()).await {
                Delivery::Queued => *delivered += 1,
                Delivery::Offline => {}
                Delivery::Disconnected => {
                    warn!(identity = %target, "Recipient dropped during delivery");
                    disconnected.push(target.to_string());
                }
            }
        }
    }
}

async fn follow_up(
    presence: PresenceNotifier,
    message: ChatMessage,
    persistence: JoinHandle<Result<(), StoreError>>,
) -> FollowUp {
    let persisted = match persistence.await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!(from = %message.from, to = %message.to, error = %e, "Failed to persist message");
            false
        }
        Err(e) => {
            error!(error = %e, "Persistence task failed");
            false
        }
    };

    let disconnected = if message.is_broadcast() {
        Vec::new()
    } else {
        presence
            .refresh_participants(&message.from, &message.to)
            .await
    };

    FollowUp {
        persisted,
        disconnected,
    }
}

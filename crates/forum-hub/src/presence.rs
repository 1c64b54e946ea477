//! Presence notifier
//!
//! Pushes personalized online-identity lists. Every observer receives its own
//! view, computed by the [`RecencySorter`] over the identities online at the
//! time of the event, minus the observer itself.

use crate::registry::{Delivery, Registry};
use crate::sorter::RecencySorter;
use forum_core::{Envelope, MessageKind};
use futures::future::join_all;
use tracing::{debug, error};

#[derive(Debug, Clone)]
pub struct PresenceNotifier {
    registry: Registry,
    sorter: RecencySorter,
}

impl PresenceNotifier {
    pub fn new(registry: Registry, sorter: RecencySorter) -> Self {
        Self { registry, sorter }
    }

    /// Personalized view of `observer`: everyone online except itself.
    pub async fn view_for(&self, observer: &str) -> Vec<String> {
        let candidates = self.registry.online_identities_excluding(observer).await;
        self.sorter.sort(observer, candidates).await
    }

    /// `identity` came online: `user_joined` to everyone else, then
    /// `initial_online_users` to the newcomer.
    ///
    /// Returns identities disconnected along the way.
    pub async fn on_join(&self, identity: &str) -> Vec<String> {
        let mut gone = self
            .notify_observers(MessageKind::UserJoined, identity)
            .await;

        let view = self.view_for(identity).await;
        let envelope = Envelope::presence_view(MessageKind::InitialOnlineUsers, identity, view);
        gone.extend(self.deliver(identity, &envelope).await);
        gone
    }

    /// `identity` went offline: `user_left` to everyone remaining.
    pub async fn on_leave(&self, identity: &str) -> Vec<String> {
        self.notify_observers(MessageKind::UserLeft, identity).await
    }

    /// A direct message changed the conversation ordering of `a` and `b`:
    /// `online_users_update` to whichever of the two is online.
    pub async fn refresh_participants(&self, a: &str, b: &str) -> Vec<String> {
        let mut gone = Vec::new();
        let participants = if a == b { vec![a] } else { vec![a, b] };

        for participant in participants {
            if !self.registry.is_online(participant).await {
                continue;
            }
            let view = self.view_for(participant).await;
            let envelope =
                Envelope::presence_view(MessageKind::OnlineUsersUpdate, participant, view);
            gone.extend(self.deliver(participant, &envelope).await);
        }
        gone
    }

    async fn notify_observers(&self, kind: MessageKind, subject: &str) -> Vec<String> {
        // The subject is never notified about itself, but it does appear in
        // the views of observers while it is online.
        let online = self.registry.online_identities_excluding(subject).await;

        let views = join_all(online.iter().map(|observer| self.view_for(observer))).await;

        let mut gone = Vec::new();
        for (observer, view) in online.iter().zip(views) {
            let envelope = Envelope::membership(kind, subject, view);
            gone.extend(self.deliver(observer, &envelope).await);
        }

        debug!(kind = %kind, subject = %subject, observers = online.len(), "Presence event sent");
        gone
    }

    async fn deliver(&self, observer: &str, envelope: &Envelope) -> Option<String> {
        let payload = match envelope.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                error!(kind = %envelope.kind, error = %e, "Failed to encode presence event");
                return None;
            }
        };

        match self.registry.send_to_identity(observer, payload).await {
            Delivery::Disconnected => Some(observer.to_string()),
            Delivery::Queued | Delivery::Offline => None,
        }
    }
}

//! Recency sorter
//!
//! Orders an observer's conversation partners most-recent-first. Candidates
//! with no conversation history follow, alphabetically. Any failure to read
//! the history degrades to a purely alphabetical list.

use forum_core::{ConversationTimestamps, MessageStore};
use std::{sync::Arc, time::Duration};
use tracing::warn;

/// Order `candidates` by the timestamps in `latest`.
///
/// Candidates with a timestamp come first, newest first, ties broken by name;
/// the remainder follows alphabetically. Identities in `latest` that are not
/// candidates are ignored.
pub fn order_by_recency(mut candidates: Vec<String>, latest: &ConversationTimestamps) -> Vec<String> {
    candidates.sort_by(|a, b| match (latest.get(a), latest.get(b)) {
        (Some(ta), Some(tb)) => tb.cmp(ta).then_with(|| a.cmp(b)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.cmp(b),
    });
    candidates
}

/// Store-backed recency sorter with a bounded lookup.
#[derive(Clone)]
pub struct RecencySorter {
    store: Arc<dyn MessageStore>,
    timeout: Duration,
}

impl std::fmt::Debug for RecencySorter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecencySorter")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RecencySorter {
    pub fn new(store: Arc<dyn MessageStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Presence view of `requester` over `candidates`.
    pub async fn sort(&self, requester: &str, mut candidates: Vec<String>) -> Vec<String> {
        if candidates.len() < 2 {
            return candidates;
        }

        let lookup = self.store.last_conversation_timestamps(requester);
        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(latest)) => order_by_recency(candidates, &latest),
            Ok(Err(e)) => {
                warn!(requester = %requester, error = %e, "Recency lookup failed, using alphabetical order");
                candidates.sort();
                candidates
            }
            Err(_) => {
                warn!(
                    requester = %requester,
                    timeout = %humantime::format_duration(self.timeout),
                    "Recency lookup timed out, using alphabetical order"
                );
                candidates.sort();
                candidates
            }
        }
    }
}

//! Subscriber registry and snapshot fan-out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::FeedError;
use crate::cache::{current_timestamp_ms, Snapshot};

/// Identifies one connected subscriber.
pub type SubscriberId = u64;

#[derive(Debug)]
struct FeedState {
    subscribers: HashMap<SubscriberId, watch::Sender<Arc<Snapshot>>>,
    latest: Arc<Snapshot>,
    next_id: SubscriberId,
}

// == Change Feed ==
/// Registry of active subscribers plus the last published snapshot.
///
/// The registry lock is a plain mutex held only for map updates and
/// non-blocking slot writes, never across an await point.
#[derive(Debug)]
pub struct ChangeFeed {
    state: Arc<Mutex<FeedState>>,
}

impl ChangeFeed {
    /// Creates a feed whose current snapshot is `initial`.
    pub fn new(initial: Snapshot) -> Self {
        Self {
            state: Arc::new(Mutex::new(FeedState {
                subscribers: HashMap::new(),
                latest: Arc::new(initial),
                next_id: 1,
            })),
        }
    }

    // == Subscribe ==
    /// Registers a new subscriber primed with the current snapshot.
    ///
    /// Only the current state is visible to a new subscriber, never history.
    pub fn subscribe(&self) -> Subscription {
        let mut state = lock(&self.state);
        let id = state.next_id;
        state.next_id += 1;

        let (sender, receiver) = watch::channel(Arc::clone(&state.latest));
        state.subscribers.insert(id, sender);
        info!(
            subscriber = id,
            active = state.subscribers.len(),
            "Change feed subscriber connected"
        );

        Subscription {
            id,
            receiver,
            feed: Arc::downgrade(&self.state),
        }
    }

    // == Publish ==
    /// Delivers `snapshot` to every subscriber and returns how many received it.
    ///
    /// A snapshot no newer than the last published one is discarded, so racing
    /// publishers can never roll subscribers back to an older state.
    /// Subscribers whose receiving side is gone are dropped from the registry.
    pub fn publish(&self, snapshot: Snapshot) -> usize {
        let mut state = lock(&self.state);
        if snapshot.version() <= state.latest.version() {
            debug!(
                version = snapshot.version(),
                latest = state.latest.version(),
                "Skipping stale snapshot"
            );
            return 0;
        }

        let snapshot = Arc::new(snapshot);
        state.latest = Arc::clone(&snapshot);

        let mut failed = Vec::new();
        for (&id, sender) in &state.subscribers {
            if sender.send(Arc::clone(&snapshot)).is_err() {
                failed.push(id);
            }
        }

        for id in &failed {
            state.subscribers.remove(id);
            let err = FeedError::SubscriberDeliveryFailure {
                subscriber: *id,
                reason: "receiver dropped".to_string(),
            };
            warn!("{}", err);
        }

        let delivered = state.subscribers.len();
        debug!(
            version = snapshot.version(),
            entries = snapshot.len(),
            delivered,
            "Published snapshot"
        );
        delivered
    }

    /// Drops every subscriber's slot. Waiting subscribers observe
    /// `FeedError::Closed` and end their sessions.
    pub fn close(&self) {
        let mut state = lock(&self.state);
        let closed = state.subscribers.len();
        state.subscribers.clear();
        info!(closed, "Change feed closed");
    }

    /// Most recently published snapshot.
    pub fn latest(&self) -> Arc<Snapshot> {
        Arc::clone(&lock(&self.state).latest)
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.state).subscribers.len()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(Snapshot::default())
    }
}

// == Subscription ==
/// One subscriber's handle on the feed. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: watch::Receiver<Arc<Snapshot>>,
    feed: Weak<Mutex<FeedState>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Returns the newest snapshot and marks it as seen.
    ///
    /// Entries that expired after the snapshot was published are left out, so
    /// a subscriber never sees a key its own `get` would report missing.
    pub fn current(&mut self) -> Arc<Snapshot> {
        let snapshot = Arc::clone(&self.receiver.borrow_and_update());
        let now = current_timestamp_ms();
        if snapshot.has_expired_at(now) {
            Arc::new(snapshot.live_at(now))
        } else {
            snapshot
        }
    }

    /// Waits until a snapshot newer than the last seen one is published.
    ///
    /// # Errors
    /// `FeedError::Closed` once the feed has been closed or dropped.
    pub async fn changed(&mut self) -> Result<Arc<Snapshot>, FeedError> {
        self.receiver
            .changed()
            .await
            .map_err(|_| FeedError::Closed)?;
        Ok(self.current())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(state) = self.feed.upgrade() {
            let mut state = lock(&state);
            if state.subscribers.remove(&self.id).is_some() {
                info!(
                    subscriber = self.id,
                    active = state.subscribers.len(),
                    "Change feed subscriber disconnected"
                );
            }
        }
    }
}

fn lock(state: &Mutex<FeedState>) -> MutexGuard<'_, FeedState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SnapshotEntry;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn snapshot(version: u64, keys: &[&str]) -> Snapshot {
        let entries = keys
            .iter()
            .map(|key| {
                (
                    key.to_string(),
                    SnapshotEntry {
                        value: format!("value_{}", key),
                        expires_at: u64::MAX / 2,
                    },
                )
            })
            .collect();
        Snapshot::new(version, entries)
    }

    #[test]
    fn test_subscribe_receives_current_snapshot() {
        let feed = ChangeFeed::new(snapshot(4, &["a"]));

        let mut sub = feed.subscribe();
        let current = sub.current();

        assert_eq!(current.version(), 4);
        assert!(current.contains_key("a"));
        assert_eq!(feed.subscriber_count(), 1);
    }

    #[test]
    fn test_current_omits_entries_expired_since_publish() {
        let now = current_timestamp_ms();
        let entry = |expires_at| SnapshotEntry {
            value: "v".to_string(),
            expires_at,
        };
        let entries = [
            ("live".to_string(), entry(now + 60_000)),
            ("gone".to_string(), entry(now.saturating_sub(1))),
        ];
        let feed = ChangeFeed::new(Snapshot::new(5, entries.into_iter().collect()));

        let current = feed.subscribe().current();

        assert_eq!(current.version(), 5);
        assert!(current.contains_key("live"));
        assert!(!current.contains_key("gone"));
        // The published copy is untouched
        assert!(feed.latest().contains_key("gone"));
    }

    #[test]
    fn test_drop_unsubscribes() {
        let feed = ChangeFeed::default();

        let first = feed.subscribe();
        let second = feed.subscribe();
        assert_ne!(first.id(), second.id());
        assert_eq!(feed.subscriber_count(), 2);

        drop(first);
        assert_eq!(feed.subscriber_count(), 1);
        drop(second);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn test_publish_discards_stale_versions() {
        let feed = ChangeFeed::default();

        assert_eq!(feed.publish(snapshot(2, &["new"])), 0);
        assert_eq!(feed.latest().version(), 2);

        feed.publish(snapshot(1, &["old"]));
        feed.publish(snapshot(2, &["dup"]));

        let latest = feed.latest();
        assert_eq!(latest.version(), 2);
        assert!(latest.contains_key("new"));
    }

    #[tokio::test]
    async fn test_slow_subscriber_sees_only_latest() {
        let feed = ChangeFeed::default();
        let mut sub = feed.subscribe();

        feed.publish(snapshot(1, &["a"]));
        feed.publish(snapshot(2, &["a", "b"]));
        feed.publish(snapshot(3, &["a", "b", "c"]));

        let seen = assert_ok!(sub.changed().await);
        assert_eq!(seen.version(), 3);
        assert_eq!(seen.len(), 3);

        // Nothing newer pending
        let pending = tokio::time::timeout(Duration::from_millis(50), sub.changed()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_publish() {
        let feed = ChangeFeed::default();
        let mut subs: Vec<_> = (0..3).map(|_| feed.subscribe()).collect();

        assert_eq!(feed.publish(snapshot(1, &["k"])), 3);

        for sub in subs.iter_mut() {
            let seen = assert_ok!(sub.changed().await);
            assert!(seen.contains_key("k"));
        }
    }

    #[tokio::test]
    async fn test_close_ends_waiting_subscribers() {
        let feed = ChangeFeed::default();
        let mut sub = feed.subscribe();

        feed.close();

        assert_eq!(feed.subscriber_count(), 0);
        assert!(matches!(sub.changed().await, Err(FeedError::Closed)));
    }

    #[tokio::test]
    async fn test_changed_errors_once_feed_is_gone() {
        let feed = ChangeFeed::default();
        let mut sub = feed.subscribe();

        drop(feed);

        let result = sub.changed().await;
        assert!(matches!(assert_err!(result), FeedError::Closed));
    }
}

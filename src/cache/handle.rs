//! Shared Cache Handle
//!
//! Owns the store behind a lock together with the change feed, so that every
//! mutation, whether from a request or the reaper, reaches subscribers.

use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{CacheStats, CacheStore, Lookup, Mutation, Snapshot};
use crate::error::Result;
use crate::feed::{ChangeFeed, Subscription};

/// Mutations drained from the store plus the snapshot captured with them.
struct Commit {
    mutations: Vec<Mutation>,
    snapshot: Snapshot,
}

// == Cache Handle ==
/// Thread-safe cache: a [`CacheStore`] guarded by an async `RwLock` and the
/// [`ChangeFeed`] fed from it.
///
/// Each mutating call captures its mutations and a versioned snapshot while
/// holding the write lock, then releases the lock before publishing.
#[derive(Debug)]
pub struct CacheHandle {
    store: RwLock<CacheStore>,
    feed: ChangeFeed,
}

impl CacheHandle {
    /// Creates a handle around `store`, seeding the feed with its contents.
    pub fn new(store: CacheStore) -> Self {
        let feed = ChangeFeed::new(store.snapshot());
        Self {
            store: RwLock::new(store),
            feed,
        }
    }

    /// Creates an empty handle holding at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(CacheStore::new(capacity))
    }

    // == Set ==
    /// Inserts or refreshes `key`. Returns the expiration instant (Unix ms).
    pub async fn set(&self, key: String, value: String, ttl_seconds: i64) -> Result<u64> {
        let (result, commit) = {
            let mut store = self.store.write().await;
            let result = store.set(key, value, ttl_seconds);
            (result, capture(&mut store))
        };
        self.publish(commit);
        result
    }

    // == Get ==
    /// Looks up a live value. Lazily removes the entry if it has expired.
    pub async fn get(&self, key: &str) -> Result<Lookup> {
        // Write lock: a hit bumps recency, a stale hit removes the entry
        let (result, commit) = {
            let mut store = self.store.write().await;
            let result = store.get(key);
            (result, capture(&mut store))
        };
        self.publish(commit);
        result
    }

    // == Delete ==
    /// Removes `key` if present. Returns whether anything was removed.
    pub async fn delete(&self, key: &str) -> bool {
        let (removed, commit) = {
            let mut store = self.store.write().await;
            let removed = store.delete(key);
            (removed, capture(&mut store))
        };
        self.publish(commit);
        removed
    }

    // == Reap ==
    /// Removes expired entries one at a time, each under its own short write
    /// lock, then publishes a single snapshot. Returns the number removed.
    pub async fn reap_expired(&self) -> usize {
        let candidates = self.store.read().await.expired_keys();

        let mut mutations = Vec::new();
        for key in candidates {
            let mut store = self.store.write().await;
            if store.remove_if_expired(&key) {
                mutations.extend(store.take_mutations());
            }
        }

        if mutations.is_empty() {
            return 0;
        }
        let removed = mutations.len();
        let snapshot = self.store.read().await.snapshot();
        self.publish(Some(Commit {
            mutations,
            snapshot,
        }));
        removed
    }

    /// Copy of all live entries.
    pub async fn snapshot(&self) -> Snapshot {
        self.store.read().await.snapshot()
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    pub async fn capacity(&self) -> usize {
        self.store.read().await.capacity()
    }

    /// Registers a change feed subscriber primed with the current snapshot.
    pub fn subscribe(&self) -> Subscription {
        self.feed.subscribe()
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    fn publish(&self, commit: Option<Commit>) {
        let Some(Commit {
            mutations,
            snapshot,
        }) = commit
        else {
            return;
        };

        for mutation in &mutations {
            match mutation {
                Mutation::Upsert {
                    key, expires_at, ..
                } => debug!(key = %key, expires_at, "Entry upserted"),
                Mutation::Remove { key, cause } => {
                    debug!(key = %key, cause = %cause, "Entry removed")
                }
            }
        }
        self.feed.publish(snapshot);
    }
}

/// Drains pending mutations; captures a snapshot only when there were any.
fn capture(store: &mut CacheStore) -> Option<Commit> {
    let mutations = store.take_mutations();
    if mutations.is_empty() {
        return None;
    }
    Some(Commit {
        mutations,
        snapshot: store.snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use std::time::Duration;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_set_publishes_snapshot() {
        let cache = CacheHandle::with_capacity(10);
        let mut sub = cache.subscribe();
        assert!(sub.current().is_empty());

        cache.set("k".to_string(), "v".to_string(), 60).await.unwrap();

        let seen = assert_ok!(sub.changed().await);
        assert_eq!(seen.get("k").unwrap().value, "v");
    }

    #[tokio::test]
    async fn test_invalid_ttl_publishes_nothing() {
        let cache = CacheHandle::with_capacity(10);
        let mut sub = cache.subscribe();

        let result = cache.set("k".to_string(), "v".to_string(), -1).await;
        assert_eq!(result, Err(CacheError::InvalidTtl(-1)));

        let pending = tokio::time::timeout(Duration::from_millis(50), sub.changed()).await;
        assert!(pending.is_err(), "No snapshot should be published");
        assert_eq!(cache.feed().latest().version(), 0);
    }

    #[tokio::test]
    async fn test_delete_absent_key_publishes_nothing() {
        let cache = CacheHandle::with_capacity(10);
        cache.set("k".to_string(), "v".to_string(), 60).await.unwrap();
        let mut sub = cache.subscribe();
        sub.current();

        assert!(!cache.delete("missing").await);

        let pending = tokio::time::timeout(Duration::from_millis(50), sub.changed()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn test_delete_publishes_removal() {
        let cache = CacheHandle::with_capacity(10);
        cache.set("k".to_string(), "v".to_string(), 60).await.unwrap();
        let mut sub = cache.subscribe();

        assert!(cache.delete("k").await);

        let seen = assert_ok!(sub.changed().await);
        assert!(!seen.contains_key("k"));
    }

    #[tokio::test]
    async fn test_get_hit_publishes_nothing() {
        let cache = CacheHandle::with_capacity(10);
        cache.set("k".to_string(), "v".to_string(), 60).await.unwrap();
        let mut sub = cache.subscribe();

        let lookup = cache.get("k").await.unwrap();
        assert_eq!(lookup.value, "v");

        let pending = tokio::time::timeout(Duration::from_millis(50), sub.changed()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn test_reap_expired_publishes_once() {
        let cache = CacheHandle::with_capacity(10);
        cache.set("a".to_string(), "1".to_string(), 1).await.unwrap();
        cache.set("b".to_string(), "2".to_string(), 1).await.unwrap();
        cache.set("c".to_string(), "3".to_string(), 60).await.unwrap();
        let mut sub = cache.subscribe();

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(cache.reap_expired().await, 2);
        let seen = assert_ok!(sub.changed().await);
        assert_eq!(seen.len(), 1);
        assert!(seen.contains_key("c"));

        assert_eq!(cache.reap_expired().await, 0);
        assert_eq!(cache.stats().await.expirations, 2);
    }

    #[tokio::test]
    async fn test_new_subscriber_never_sees_expired_entries() {
        let cache = CacheHandle::with_capacity(10);
        assert_ok!(cache.set("x".to_string(), "v".to_string(), 1).await);
        assert_ok!(cache.set("y".to_string(), "w".to_string(), 60).await);

        // No reaper running, so nothing publishes the expiry
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(!cache.snapshot().await.contains_key("x"));

        let first = cache.subscribe().current();
        assert!(!first.contains_key("x"));
        assert!(first.contains_key("y"));
    }

    #[tokio::test]
    async fn test_concurrent_writers_converge() {
        let cache = std::sync::Arc::new(CacheHandle::with_capacity(100));
        let mut sub = cache.subscribe();

        let mut tasks = Vec::new();
        for i in 0..20 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move {
                cache
                    .set(format!("key{}", i), format!("value{}", i), 60)
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let latest = cache.feed().latest();
        assert_eq!(latest.len(), 20);
        assert_eq!(latest.version(), 20);

        let seen = assert_ok!(sub.changed().await);
        assert_eq!(seen.len(), 20);
    }
}

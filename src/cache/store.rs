//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking and TTL expiration.
//!
//! Every change to the store is recorded as a [`Mutation`] in an internal
//! journal and bumps the store version. Owners drain the journal with
//! [`CacheStore::take_mutations`] after each operation.

use std::collections::HashMap;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{
    CacheEntry, CacheStats, LruTracker, Mutation, RemovalCause, Snapshot, SnapshotEntry,
};
use crate::error::{CacheError, Result};

/// Successful result of a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub value: String,
    /// Expiration instant (Unix milliseconds)
    pub expires_at: u64,
    /// Remaining time to live in milliseconds, always > 0
    pub ttl_remaining_ms: u64,
}

// == Cache Store ==
/// Main cache storage with LRU eviction and TTL support.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: usize,
    /// Bumped once per mutation
    version: u64,
    /// Mutations not yet collected by the owner
    journal: Vec<Mutation>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore holding at most `capacity` entries.
    ///
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity),
            lru: LruTracker::with_capacity(capacity),
            stats: CacheStats::new(),
            capacity,
            version: 0,
            journal: Vec::new(),
        }
    }

    // == Set ==
    /// Stores a key-value pair expiring `ttl_seconds` from now.
    ///
    /// If the key already exists, the value is replaced and the TTL restarts
    /// from now. If a new key would exceed capacity, the least recently used
    /// entry is evicted first.
    ///
    /// Returns the expiration instant (Unix milliseconds).
    ///
    /// # Errors
    /// `InvalidTtl` when `ttl_seconds <= 0`; the store is left untouched.
    pub fn set(&mut self, key: String, value: String, ttl_seconds: i64) -> Result<u64> {
        if ttl_seconds <= 0 {
            return Err(CacheError::InvalidTtl(ttl_seconds));
        }
        let now = current_timestamp_ms();

        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_lru(now);
        }

        let entry = CacheEntry::new_at(value, ttl_seconds as u64, now);
        let expires_at = entry.expires_at;
        let mutation = Mutation::Upsert {
            key: key.clone(),
            value: entry.value.clone(),
            expires_at: entry.expires_at,
        };
        self.lru.touch(&key);
        self.entries.insert(key, entry);
        self.stats.set_total_entries(self.entries.len());
        self.record(mutation);

        Ok(expires_at)
    }

    // == Get ==
    /// Retrieves a live value by key and marks it most recently used.
    ///
    /// An expired entry is removed on the spot and reported as `NotFound`.
    pub fn get(&mut self, key: &str) -> Result<Lookup> {
        let now = current_timestamp_ms();

        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                self.stats.record_miss();
                return Err(CacheError::NotFound(key.to_string()));
            }
        };

        if expired {
            self.remove_entry(key, RemovalCause::Expired);
            self.stats.record_miss();
            return Err(CacheError::NotFound(key.to_string()));
        }

        self.lru.touch(key);
        self.stats.record_hit();
        let entry = &self.entries[key];
        Ok(Lookup {
            value: entry.value.clone(),
            expires_at: entry.expires_at,
            ttl_remaining_ms: entry.expires_at - now,
        })
    }

    // == Delete ==
    /// Removes an entry by key.
    ///
    /// Returns whether an entry was removed. Deleting an absent key is a
    /// no-op and records no mutation.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key, RemovalCause::Deleted).is_some()
    }

    // == Snapshot ==
    /// Returns a copy of every entry still live at call time.
    pub fn snapshot(&self) -> Snapshot {
        let now = current_timestamp_ms();
        let entries = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, entry)| {
                (
                    key.clone(),
                    SnapshotEntry {
                        value: entry.value.clone(),
                        expires_at: entry.expires_at,
                    },
                )
            })
            .collect();
        Snapshot::new(self.version, entries)
    }

    // == Expiration Sweep Helpers ==
    /// Lists keys whose entries have expired.
    pub fn expired_keys(&self) -> Vec<String> {
        let now = current_timestamp_ms();
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Removes `key` only if it is still expired.
    ///
    /// A key refreshed since it was listed by [`expired_keys`](Self::expired_keys)
    /// is left alone.
    pub fn remove_if_expired(&mut self, key: &str) -> bool {
        let now = current_timestamp_ms();
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired_at(now));
        if expired {
            self.remove_entry(key, RemovalCause::Expired);
        }
        expired
    }

    // == Journal ==
    /// Drains the mutations recorded since the last call.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.journal)
    }

    /// Current store version; grows by one per mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Number of entries held, including expired ones not yet removed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Evicts the least recently used entry. An entry that had already
    /// expired is accounted as an expiration rather than an eviction.
    fn evict_lru(&mut self, now: u64) {
        let Some(victim) = self.lru.evict_oldest() else {
            return;
        };
        let cause = match self.entries.get(&victim) {
            Some(entry) if entry.is_expired_at(now) => RemovalCause::Expired,
            _ => RemovalCause::Evicted,
        };
        self.remove_entry(&victim, cause);
    }

    fn remove_entry(&mut self, key: &str, cause: RemovalCause) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        self.stats.set_total_entries(self.entries.len());
        match cause {
            RemovalCause::Evicted => self.stats.record_eviction(),
            RemovalCause::Expired => self.stats.record_expiration(),
            RemovalCause::Deleted => {}
        }
        self.record(Mutation::Remove {
            key: key.to_string(),
            cause,
        });
        Some(entry)
    }

    fn record(&mut self, mutation: Mutation) {
        self.version += 1;
        self.journal.push(mutation);
    }
}

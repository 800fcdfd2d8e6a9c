//! Mutation events emitted by the store.

use std::fmt;

/// Why an entry left the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// Explicit delete request
    Deleted,
    /// TTL elapsed (lazy removal on access or a reaper sweep)
    Expired,
    /// Pushed out by the LRU policy to admit a new key
    Evicted,
}

impl fmt::Display for RemovalCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemovalCause::Deleted => "deleted",
            RemovalCause::Expired => "expired",
            RemovalCause::Evicted => "evicted",
        };
        f.write_str(name)
    }
}

/// A single change applied to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Upsert {
        key: String,
        value: String,
        expires_at: u64,
    },
    Remove {
        key: String,
        cause: RemovalCause,
    },
}

impl Mutation {
    pub fn key(&self) -> &str {
        match self {
            Mutation::Upsert { key, .. } | Mutation::Remove { key, .. } => key,
        }
    }
}

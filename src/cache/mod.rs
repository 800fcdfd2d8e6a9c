//! Cache Module
//!
//! Provides in-memory caching with TTL expiration and LRU eviction.

mod entry;
mod handle;
mod lru;
mod mutation;
mod snapshot;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, format_timestamp_ms, CacheEntry};
pub use handle::CacheHandle;
pub use lru::LruTracker;
pub use mutation::{Mutation, RemovalCause};
pub use snapshot::{Snapshot, SnapshotEntry};
pub use stats::CacheStats;
pub use store::{CacheStore, Lookup};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB

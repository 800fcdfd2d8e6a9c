//! LRU Cache Server - an in-memory key-value cache with a live change feed
//!
//! Stores string values with a TTL under a fixed capacity, evicting the least
//! recently used entry when full, and pushes full snapshots of the live
//! contents to WebSocket subscribers after every change.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::CacheHandle;
pub use config::Config;
pub use tasks::spawn_reaper;

//! Expiration Reaper
//!
//! Background task that periodically removes expired cache entries,
//! independent of request traffic.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::CacheHandle;

/// Spawns a background task sweeping expired entries every `interval`.
///
/// Each removal goes through the same mutation path as an explicit delete,
/// so subscribers of the change feed observe it. Only one entry is removed
/// per write-lock acquisition, so concurrent requests are never held up for
/// longer than a single removal.
///
/// # Returns
/// A JoinHandle for the spawned task, aborted by the entry point on shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(CacheHandle::with_capacity(100));
/// let reaper = spawn_reaper(cache.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// reaper.abort();
/// ```
pub fn spawn_reaper(cache: Arc<CacheHandle>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting expiration reaper with interval of {:?}", interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let removed = cache.reap_expired().await;
            if removed > 0 {
                info!("Reaper: removed {} expired entries", removed);
            } else {
                debug!("Reaper: no expired entries found");
            }
        }
    })
}

//! Change Feed Module
//!
//! Distributes the latest full cache snapshot to connected subscribers.
//!
//! # Delivery policy
//! Each subscriber owns a single-slot buffer holding the newest snapshot not
//! yet consumed. Publishing overwrites that slot (drop-oldest, depth 1) and
//! never waits on a subscriber, so a slow listener only ever skips
//! intermediate states and always converges on the latest one.

mod error;
mod hub;

pub use error::FeedError;
pub use hub::{ChangeFeed, SubscriberId, Subscription};

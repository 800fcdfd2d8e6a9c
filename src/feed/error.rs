//! Errors local to the change feed.
//!
//! These are logged at the subscriber boundary and never propagated to the
//! request or task that caused a mutation.

use thiserror::Error;

use super::SubscriberId;

#[derive(Error, Debug)]
pub enum FeedError {
    /// A snapshot could not be handed to a subscriber
    #[error("Delivery to subscriber {subscriber} failed: {reason}")]
    SubscriberDeliveryFailure {
        subscriber: SubscriberId,
        reason: String,
    },

    /// The feed shut down while a subscriber was waiting
    #[error("Change feed closed")]
    Closed,

    /// Snapshot could not be encoded for the wire
    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

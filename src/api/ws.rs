//! Change feed WebSocket endpoint.
//!
//! Each connection becomes one feed subscriber. The full snapshot is sent on
//! connect and again whenever a newer one is published.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tracing::{debug, warn};

use super::AppState;
use crate::cache::{CacheHandle, Snapshot};
use crate::feed::{FeedError, SubscriberId};

/// Handler for GET /cacheUpdates (WebSocket upgrade)
pub async fn feed_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| feed_session(socket, state.cache))
}

/// Runs one subscriber until either side goes away.
///
/// The send half pushes snapshots; the receive half only watches for the
/// client closing. When one finishes the other is aborted, which drops the
/// subscription and unregisters it from the feed.
async fn feed_session(socket: WebSocket, cache: Arc<CacheHandle>) {
    let mut subscription = cache.subscribe();
    let id = subscription.id();
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        let mut snapshot = subscription.current();
        loop {
            if let Err(err) = send_snapshot(&mut sender, id, &snapshot).await {
                warn!("{}", err);
                break;
            }
            match subscription.changed().await {
                Ok(next) => snapshot = next,
                Err(err) => {
                    debug!(subscriber = id, "{}", err);
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if let Message::Close(_) = message {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    debug!(subscriber = id, "Feed session ended");
}

async fn send_snapshot(
    sender: &mut SplitSink<WebSocket, Message>,
    subscriber: SubscriberId,
    snapshot: &Snapshot,
) -> Result<(), FeedError> {
    let payload = snapshot.to_json()?;
    sender
        .send(Message::Text(payload))
        .await
        .map_err(|err| FeedError::SubscriberDeliveryFailure {
            subscriber,
            reason: err.to_string(),
        })
}

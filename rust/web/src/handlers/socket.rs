use crate::events::EventSubscription;
use crate::session::SessionManager;
use crate::store::SessionId;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use warp::ws::{Message, WebSocket};

const OUTBOUND_BUFFER: usize = 64;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Messages a viewer may send. Anything else is ignored.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join { id: SessionId },
}

/// Drives one `/socket` connection until the client goes away.
///
/// Each joined room gets a forwarding task that copies room events into the
/// connection's outbound queue; a single writer task owns the socket sink.
/// Dropping a forwarder drops its subscription, which leaves the room.
pub async fn handle_socket(socket: WebSocket, sessions: Arc<SessionManager>) {
    let connection_id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(connection_id, "viewer socket connected");

    let (mut sink, mut inbound) = socket.split();
    let (outbound, mut queue) = mpsc::channel::<String>(OUTBOUND_BUFFER);

    let writer = tokio::spawn(async move {
        while let Some(text) = queue.recv().await {
            if let Err(err) = sink.send(Message::text(text)).await {
                tracing::debug!(connection_id, error = %err, "socket write failed");
                break;
            }
        }
        let _ = sink.close().await;
    });

    let mut rooms: HashMap<SessionId, JoinHandle<()>> = HashMap::new();

    while let Some(message) = inbound.next().await {
        let message = match message {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(connection_id, error = %err, "socket read failed");
                break;
            }
        };
        if message.is_close() {
            break;
        }
        let Ok(text) = message.to_str() else {
            continue;
        };

        match serde_json::from_str::<ClientMessage>(text) {
            Ok(ClientMessage::Join { id }) => {
                if !needs_forwarder(&rooms, &id) {
                    continue;
                }
                let subscription = sessions.bus().subscribe(id.clone());
                if outbound.send(joined_ack(&id)).await.is_err() {
                    break;
                }
                let forwarder = tokio::spawn(forward(subscription, outbound.clone()));
                rooms.insert(id, forwarder);
            }
            Err(err) => {
                tracing::debug!(connection_id, error = %err, "ignoring unrecognized message");
            }
        }
    }

    for (_, forwarder) in rooms.drain() {
        forwarder.abort();
    }
    drop(outbound);
    let _ = writer.await;

    tracing::debug!(connection_id, "viewer socket closed");
}

async fn forward(mut subscription: EventSubscription, outbound: mpsc::Sender<String>) {
    while let Some(event) = subscription.receiver.recv().await {
        let text = match serde_json::to_string(&event) {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(
                    session_id = %subscription.session_id(),
                    event = event.name(),
                    error = %err,
                    "failed to serialize draft event"
                );
                continue;
            }
        };
        if outbound.send(text).await.is_err() {
            break;
        }
    }
}

// A forwarder ends when the hub drops its subscriber for lagging; such a
// room can be joined again.
fn needs_forwarder(rooms: &HashMap<SessionId, JoinHandle<()>>, session_id: &SessionId) -> bool {
    !rooms
        .get(session_id)
        .is_some_and(|forwarder| !forwarder.is_finished())
}

fn joined_ack(session_id: &str) -> String {
    serde_json::json!({
        "event": "joined",
        "data": { "id": session_id },
    })
    .to_string()
}

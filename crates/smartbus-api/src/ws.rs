//! `WebSocket` handler for the live bus-location stream.
//!
//! Clients connect to `GET /ws` and receive one text frame per accepted
//! location report:
//!
//! ```json
//! {"event":"busLocationUpdate","data":{"bus_id":1,"latitude":13.08,"longitude":80.27,"speed":35.0}}
//! ```
//!
//! Each connection owns one hub [`Subscription`](smartbus_core::Subscription).
//! A client that cannot take a frame within the configured send timeout
//! is detached; so is one whose hub queue overflowed. Either way the
//! socket is closed and no other client is affected.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::Serialize;
use smartbus_core::{BroadcastHub, Subscription};
use smartbus_types::LocationUpdate;
use tracing::{debug, warn};

use crate::state::AppState;

/// Event name carried by every live frame.
pub const LOCATION_EVENT: &str = "busLocationUpdate";

/// Envelope for a live update.
#[derive(Debug, Serialize)]
struct LiveFrame<'a> {
    event: &'static str,
    data: &'a LocationUpdate,
}

/// Encode an update as the JSON text sent to clients.
pub fn encode_update(update: &LocationUpdate) -> Result<String, serde_json::Error> {
    serde_json::to_string(&LiveFrame {
        event: LOCATION_EVENT,
        data: update,
    })
}

/// How a live stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The client closed the connection or it dropped.
    ClientClosed,
    /// The hub detached the subscriber after its queue overflowed.
    HubDetached,
    /// Writing to the client failed.
    SendFailed,
    /// A write did not complete within the send timeout.
    SendTimedOut,
}

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming location updates.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_live(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
    let subscription = state.subscribe();
    let id = subscription.id();
    debug!(subscriber = %id, "WebSocket client connected");

    let end = forward_updates(socket, subscription, state.hub(), state.send_timeout).await;
    debug!(subscriber = %id, ?end, "WebSocket stream ended");
}

/// Forward every update from `subscription` to `socket` as a text frame
/// until either side goes away.
///
/// Every write, including close and pong frames, must finish within
/// `send_timeout`. A write that does not, or that fails, detaches the
/// subscriber from `hub`. The subscription is dropped on return, so the
/// hub never delivers to it again.
pub async fn forward_updates<S, E>(
    mut socket: S,
    mut subscription: Subscription,
    hub: &BroadcastHub,
    send_timeout: Duration,
) -> StreamEnd
where
    S: Sink<Message> + Stream<Item = Result<Message, E>> + Unpin,
    <S as Sink<Message>>::Error: core::fmt::Display,
    E: core::fmt::Display,
{
    let id = subscription.id();

    loop {
        tokio::select! {
            update = subscription.recv() => {
                let Some(update) = update else {
                    debug!(subscriber = %id, "Subscriber detached by hub, closing socket");
                    // Best effort; the client may already be gone.
                    let _closed = tokio::time::timeout(send_timeout, socket.send(Message::Close(None))).await;
                    return StreamEnd::HubDetached;
                };
                let json = match encode_update(&update) {
                    Ok(j) => j,
                    Err(e) => {
                        warn!(subscriber = %id, "Failed to serialize location update: {e}");
                        continue;
                    }
                };
                if let Err(end) = send_bounded(&mut socket, Message::Text(json.into()), send_timeout).await {
                    hub.unsubscribe(id);
                    return end;
                }
            }
            // Check if the client sent a close frame or disconnected.
            msg = socket.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(subscriber = %id, "WebSocket client disconnected");
                        return StreamEnd::ClientClosed;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(end) = send_bounded(&mut socket, Message::Pong(data), send_timeout).await {
                            hub.unsubscribe(id);
                            return end;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(subscriber = %id, "WebSocket error: {e}");
                        return StreamEnd::ClientClosed;
                    }
                    _ => {
                        // The stream is push-only; client text and binary frames are ignored.
                    }
                }
            }
        }
    }
}

async fn send_bounded<S>(socket: &mut S, msg: Message, send_timeout: Duration) -> Result<(), StreamEnd>
where
    S: Sink<Message> + Unpin,
    S::Error: core::fmt::Display,
{
    match tokio::time::timeout(send_timeout, socket.send(msg)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            debug!("WebSocket send failed, detaching: {e}");
            Err(StreamEnd::SendFailed)
        }
        Err(_elapsed) => {
            debug!(
                timeout_ms = send_timeout.as_millis(),
                "WebSocket send timed out, detaching"
            );
            Err(StreamEnd::SendTimedOut)
        }
    }
}

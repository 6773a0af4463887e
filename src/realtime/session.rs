//! WebSocket session handling
//!
//! Accepts upgrades on the realtime endpoint, registers the connection under
//! its claimed identity, then runs the receive loop until the client goes
//! away. A single bad message gets an `error` reply; only transport-level
//! failures close the connection.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use super::envelope::{parse_client_message, ClientMessage, WsEnvelope};
use super::registry::{
    ClientHandle, ConnectionId, ConnectionRegistry, ANONYMOUS_IDENTITY, OUTBOUND_QUEUE_CAPACITY,
};
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub user_id: Option<String>,
}

/// WebSocket upgrade handler for `GET /ws/updates`.
///
/// Clients may claim a subscriber identity via the `user_id` query
/// parameter; absent, they share the anonymous identity.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let identity = query
        .user_id
        .unwrap_or_else(|| ANONYMOUS_IDENTITY.to_string());
    ws.on_upgrade(move |socket| handle_socket(socket, identity, state.registry.clone()))
}

/// Run one connection from registration to teardown.
async fn handle_socket(socket: WebSocket, identity: String, registry: Arc<ConnectionRegistry>) {
    let (mut sink, mut stream) = socket.split();

    // Writer task: drains frames queued by the registry into the socket.
    // When it exits the channel closes, and the next registry write to this
    // connection fails and prunes it. The queue is bounded; frames for a
    // client that cannot keep up are dropped, not accumulated.
    let (tx, mut rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE_CAPACITY);
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    let handle = ClientHandle::new(identity.clone(), tx);
    let conn_id = handle.id;
    registry.register(handle).await;
    registry
        .send_to_connection(conn_id, &WsEnvelope::connection(&identity))
        .await;

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                log::debug!("Received WS message from {}: {:.100}", identity, text);
                handle_client_text(&registry, conn_id, &text).await;
            }
            Ok(Message::Close(_)) => {
                break;
            }
            // Protocol pings are answered by axum itself
            Ok(_) => {}
            Err(e) => {
                log::warn!("WebSocket error for {}: {}", identity, e);
                break;
            }
        }
    }

    registry.unregister(conn_id, &identity).await;
    writer.abort();
}

/// Dispatch one inbound text frame. Replies go back to the same connection.
async fn handle_client_text(registry: &ConnectionRegistry, conn_id: ConnectionId, text: &str) {
    match parse_client_message(text) {
        Ok(ClientMessage::Ping) => {
            registry
                .send_to_connection(conn_id, &WsEnvelope::pong())
                .await;
        }
        Ok(ClientMessage::Subscribe { topics }) => {
            registry
                .send_to_connection(conn_id, &WsEnvelope::subscription(&topics))
                .await;
        }
        Ok(ClientMessage::Other(raw)) => {
            // Unrecognized but well-formed messages are echoed back verbatim
            registry.send_raw_to_connection(conn_id, raw).await;
        }
        Err(e) => {
            log::debug!("Undecodable WS message: {}", e);
            registry
                .send_to_connection(conn_id, &WsEnvelope::error(&e.to_string()))
                .await;
        }
    }
}

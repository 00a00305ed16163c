use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::auth::jwt::validate_token;
use crate::state::AppState;
use crate::ws::manager::WsManager;

/// Optional query parameters for the WebSocket upgrade request.
///
/// Browsers cannot set an `Authorization` header on a WebSocket handshake,
/// so the access token is accepted as a query parameter instead.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Inbound client message managing room subscriptions.
#[derive(Debug, Deserialize)]
struct ClientMessage {
    action: String,
    room: Option<String>,
}

/// HTTP handler that upgrades the connection to WebSocket.
///
/// An invalid token is not an error: the connection proceeds anonymously and
/// simply cannot join authenticated rooms.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let claims = params
        .token
        .as_deref()
        .and_then(|t| validate_token(t, &state.config.jwt).ok());

    ws.on_upgrade(move |socket| {
        handle_socket(
            socket,
            state.ws_manager,
            claims.as_ref().map(|c| c.sub),
            claims.map(|c| c.role),
        )
    })
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with `WsManager`.
///   2. Spawns a sender task that forwards messages from the manager channel.
///   3. Processes inbound subscribe/unsubscribe messages on the current task.
///   4. Cleans up on disconnect.
async fn handle_socket(
    socket: WebSocket,
    ws_manager: Arc<WsManager>,
    user_id: Option<canopy_core::types::DbId>,
    role: Option<String>,
) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, user_id = ?user_id, "WebSocket connected");

    // Register and get the receiver for outbound messages.
    let mut rx = ws_manager.add(conn_id.clone(), user_id, role).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // Receiver loop: process inbound messages.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(Message::Text(text)) => {
                handle_client_message(&ws_manager, &conn_id, text.as_str()).await;
            }
            Ok(_msg) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Clean up: remove connection and abort sender task.
    ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

/// Process one inbound JSON message: `{"action": "subscribe"|"unsubscribe", "room": "..."}`.
///
/// Malformed messages are ignored; a rejected join (unknown connection or
/// insufficient role) is logged at debug level only.
async fn handle_client_message(ws_manager: &WsManager, conn_id: &str, text: &str) {
    let Ok(msg) = serde_json::from_str::<ClientMessage>(text) else {
        tracing::debug!(conn_id = %conn_id, "Ignoring malformed WebSocket message");
        return;
    };
    let Some(room) = msg.room else {
        return;
    };

    match msg.action.as_str() {
        "subscribe" => {
            let joined = ws_manager.join_room(conn_id, &room).await;
            if joined {
                tracing::debug!(conn_id = %conn_id, room = %room, "Joined room");
            } else {
                tracing::debug!(conn_id = %conn_id, room = %room, "Room join rejected");
            }
        }
        "unsubscribe" => {
            ws_manager.leave_room(conn_id, &room).await;
            tracing::debug!(conn_id = %conn_id, room = %room, "Left room");
        }
        other => {
            tracing::debug!(conn_id = %conn_id, action = %other, "Unknown WebSocket action");
        }
    }
}

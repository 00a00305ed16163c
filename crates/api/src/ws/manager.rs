use std::collections::{HashMap, HashSet};

use axum::body::Bytes;
use axum::extract::ws::Message;
use tokio::sync::{mpsc, RwLock};

use canopy_core::types::{DbId, Timestamp};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Name of the admin-only room carrying batch summaries.
pub const ROOM_ADMIN: &str = "admin";

/// Room name for a single user's private channel.
pub fn user_room(user_id: DbId) -> String {
    format!("user:{user_id}")
}

/// Room name for all subscribers of one forest.
pub fn forest_room(forest_id: DbId) -> String {
    format!("forest:{forest_id}")
}

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Authenticated user ID, if the connection presented a valid token.
    pub user_id: Option<DbId>,
    /// Role carried by the token; gates joining the admin room.
    pub role: Option<String>,
    /// Rooms this connection is subscribed to.
    pub rooms: HashSet<String>,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Manages all active WebSocket connections and their room subscriptions.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application. Delivery is fire-and-forget: connections
/// whose send channels are closed are silently skipped and cleaned up on
/// their next receive loop iteration.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    ///
    /// Authenticated connections start subscribed to their own user room.
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(
        &self,
        conn_id: String,
        user_id: Option<DbId>,
        role: Option<String>,
    ) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut rooms = HashSet::new();
        if let Some(user_id) = user_id {
            rooms.insert(user_room(user_id));
        }
        let conn = WsConnection {
            user_id,
            role,
            rooms,
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Remove a connection by its ID.
    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    /// Subscribe a connection to a room.
    ///
    /// Returns `false` when the connection is unknown or lacks the role the
    /// room requires (the admin room needs an admin token).
    pub async fn join_room(&self, conn_id: &str, room: &str) -> bool {
        let mut conns = self.connections.write().await;
        let Some(conn) = conns.get_mut(conn_id) else {
            return false;
        };
        if room == ROOM_ADMIN && conn.role.as_deref() != Some(canopy_core::roles::ROLE_ADMIN) {
            return false;
        }
        conn.rooms.insert(room.to_string());
        true
    }

    /// Unsubscribe a connection from a room.
    pub async fn leave_room(&self, conn_id: &str, room: &str) {
        let mut conns = self.connections.write().await;
        if let Some(conn) = conns.get_mut(conn_id) {
            conn.rooms.remove(room);
        }
    }

    /// Send a message to every connection subscribed to a room.
    ///
    /// Returns the number of connections the message was sent to.
    pub async fn send_to_room(&self, room: &str, message: Message) -> usize {
        let conns = self.connections.read().await;
        let mut count = 0;
        for conn in conns.values() {
            if conn.rooms.contains(room) {
                let _ = conn.sender.send(message.clone());
                count += 1;
            }
        }
        count
    }

    /// Broadcast a message to all connected clients.
    pub async fn broadcast(&self, message: Message) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(message.clone());
        }
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    ///
    /// Used by the heartbeat task to keep connections alive and detect
    /// stale ones.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}

//! Route definitions for the real-time endpoints (SSE + WebSocket).

use axum::routing::get;
use axum::Router;

use crate::sse;
use crate::state::AppState;
use crate::ws;

/// Routes mounted at `/realtime`.
///
/// ```text
/// GET /events  -> SSE stream (connected, welcome, initial-stats, events, heartbeat)
/// GET /ws      -> WebSocket upgrade (room subscribe/unsubscribe protocol)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(sse::event_stream))
        .route("/ws", get(ws::ws_handler))
}

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: canopy_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket room manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Event bus carrying post-commit domain events.
    pub event_bus: Arc<canopy_events::EventBus>,
}

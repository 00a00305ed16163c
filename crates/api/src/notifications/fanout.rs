//! Event-to-room fan-out engine.
//!
//! [`EventFanout`] consumes committed domain events from the broadcast
//! channel and pushes each one to the rooms it belongs to. Delivery is
//! fire-and-forget: a dropped client or a lagging receiver never affects
//! the request that produced the event.

use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::broadcast;

use canopy_events::DomainEvent;

use crate::ws::{forest_room, user_room, WsManager, ROOM_ADMIN};

/// Routes domain events to WebSocket rooms.
pub struct EventFanout {
    ws_manager: Arc<WsManager>,
}

impl EventFanout {
    /// Create a new fan-out with the given WebSocket manager.
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the main routing loop.
    ///
    /// Subscribes to the event bus via `receiver` and processes each event.
    /// The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](canopy_events::EventBus) is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<DomainEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.route_event(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event fan-out lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, fan-out shutting down");
                    break;
                }
            }
        }
    }

    /// Deliver a single event to its rooms.
    ///
    /// Per-entity events go to the owning forest's room and to the acting
    /// user's room; batch summaries go to the admin room only.
    async fn route_event(&self, event: &DomainEvent) {
        let text = match serde_json::to_string(event) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, event_type = %event.event_type, "Failed to serialize event");
                return;
            }
        };
        let message = Message::Text(text.into());

        let mut delivered = 0usize;

        if event.is_bulk_summary() {
            delivered += self.ws_manager.send_to_room(ROOM_ADMIN, message).await;
        } else {
            if let Some(forest_id) = event.forest_id {
                delivered += self
                    .ws_manager
                    .send_to_room(&forest_room(forest_id), message.clone())
                    .await;
            }
            if let Some(user_id) = event.actor_user_id {
                delivered += self
                    .ws_manager
                    .send_to_room(&user_room(user_id), message)
                    .await;
            }
        }

        tracing::trace!(
            event_type = %event.event_type,
            delivered,
            "Routed event to rooms"
        );
    }
}

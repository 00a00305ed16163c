//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the central publish/subscribe hub for [`DomainEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` across the application.
//! Handlers publish strictly after their transaction commits; delivery is
//! best-effort and a publish can never fail the originating request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use canopy_core::types::DbId;

// ---------------------------------------------------------------------------
// DomainEvent
// ---------------------------------------------------------------------------

/// A domain event describing a committed state change.
///
/// Constructed via [`DomainEvent::new`] and enriched with the builder
/// methods [`with_entity`](DomainEvent::with_entity),
/// [`with_actor`](DomainEvent::with_actor),
/// [`with_forest`](DomainEvent::with_forest), and
/// [`with_payload`](DomainEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEvent {
    /// Dot-separated event name, e.g. `"tree.created"`, `"tree.bulk_deleted"`.
    pub event_type: String,

    /// Optional subject entity kind (e.g. `"tree"`, `"forest"`).
    pub entity_type: Option<String>,

    /// Optional subject entity database id.
    pub entity_id: Option<DbId>,

    /// Optional id of the user that triggered the event.
    pub actor_user_id: Option<DbId>,

    /// Forest the subject belongs to, used for room-scoped delivery.
    pub forest_id: Option<DbId>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent {
    /// Create a new event with only the required `event_type`.
    ///
    /// All optional fields default to `None` / empty object.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            entity_type: None,
            entity_id: None,
            actor_user_id: None,
            forest_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Attach the subject entity to the event.
    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id);
        self
    }

    /// Attach the acting user to the event.
    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    /// Attach the owning forest, enabling forest-room delivery.
    pub fn with_forest(mut self, forest_id: DbId) -> Self {
        self.forest_id = Some(forest_id);
        self
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// True for the one-per-batch summary events (`*.bulk_*`).
    pub fn is_bulk_summary(&self) -> bool {
        self.event_type
            .split('.')
            .nth(1)
            .is_some_and(|name| name.starts_with("bulk_"))
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`DomainEvent`].
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// the SendError only means there are zero receivers.
    pub fn publish(&self, event: DomainEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let event = DomainEvent::new("tree.created")
            .with_entity("tree", 42)
            .with_actor(7)
            .with_forest(3)
            .with_payload(serde_json::json!({"species": "Oak"}));

        bus.publish(event);

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, "tree.created");
        assert_eq!(received.entity_type.as_deref(), Some("tree"));
        assert_eq!(received.entity_id, Some(42));
        assert_eq!(received.actor_user_id, Some(7));
        assert_eq!(received.forest_id, Some(3));
        assert_eq!(received.payload["species"], "Oak");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(DomainEvent::new("measurement.added"));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");

        assert_eq!(e1.event_type, "measurement.added");
        assert_eq!(e2.event_type, "measurement.added");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(DomainEvent::new("tree.updated"));
    }

    #[test]
    fn bulk_summary_detection() {
        assert!(DomainEvent::new("tree.bulk_created").is_bulk_summary());
        assert!(DomainEvent::new("measurement.bulk_added").is_bulk_summary());
        assert!(!DomainEvent::new("tree.created").is_bulk_summary());
        assert!(!DomainEvent::new("bulk").is_bulk_summary());
    }
}

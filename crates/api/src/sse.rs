//! Server-Sent Events stream for clients that cannot hold a WebSocket.
//!
//! `GET /api/v1/realtime/events` emits, in order: a `connected` event, a
//! `welcome` event, an `initial-stats` snapshot, then every domain event
//! published on the bus (named by its event type) interleaved with periodic
//! `heartbeat` events. Delivery is fire-and-forget; a lagged subscriber
//! skips ahead rather than stalling the stream.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use futures::stream::Stream;
use serde_json::json;
use tokio::sync::broadcast;

use canopy_db::repositories::DashboardRepo;

use crate::state::AppState;

/// Interval between heartbeat events (in seconds).
const HEARTBEAT_INTERVAL_SECS: u64 = 15;

/// GET /realtime/events -- attach an SSE subscriber to the event bus.
pub async fn event_stream(State(state): State<AppState>) -> impl IntoResponse {
    tracing::info!("New SSE client connected");

    // Snapshot the counters up front so the stream itself owns no pool.
    let initial_stats = match DashboardRepo::overview(&state.pool).await {
        Ok(stats) => json!(stats),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load initial stats for SSE client");
            json!({})
        }
    };

    let receiver = state.event_bus.subscribe();

    Sse::new(build_stream(receiver, initial_stats)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS))
            .text("keep-alive"),
    )
}

/// Build the event stream: greeting events, then bus events + heartbeats.
fn build_stream(
    mut receiver: broadcast::Receiver<canopy_events::DomainEvent>,
    initial_stats: serde_json::Value,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        yield Ok(Event::default().event("connected").data("connected"));
        yield Ok(Event::default()
            .event("welcome")
            .data(json!({"service": "canopy", "version": env!("CARGO_PKG_VERSION")}).to_string()));
        yield Ok(Event::default()
            .event("initial-stats")
            .data(initial_stats.to_string()));

        let mut heartbeat = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
        heartbeat.tick().await; // first tick fires immediately; skip it

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    yield Ok(Event::default()
                        .event("heartbeat")
                        .data(json!({"timestamp": chrono::Utc::now().to_rfc3339()}).to_string()));
                }
                received = receiver.recv() => {
                    match received {
                        Ok(event) => {
                            let data = match serde_json::to_string(&event) {
                                Ok(data) => data,
                                Err(e) => {
                                    tracing::error!(error = %e, "Failed to serialize SSE event");
                                    continue;
                                }
                            };
                            yield Ok(Event::default().event(event.event_type.clone()).data(data));
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "SSE subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::info!("Event bus closed, ending SSE stream");
                            break;
                        }
                    }
                }
            }
        }
    }
}

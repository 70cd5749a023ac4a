//! Server-Sent Events (SSE) utilities
//!
//! Turns EventBus subscriptions into SSE streams for the HTTP layer.

use crate::events::{ArenaEvent, EventBus};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Convert an ArenaEvent into an SSE event named after its type
pub fn to_sse_event(event: &ArenaEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(data) => Some(Event::default().event(event.event_type()).data(data)),
        Err(e) => {
            warn!("SSE: failed to serialize {}: {}", event.event_type(), e);
            None
        }
    }
}

/// Create an SSE stream of bus events
///
/// When `battle_filter` is set, only events for that battle are forwarded
/// (events without a battle id, such as duet tip settlements, are skipped).
/// Lagging clients skip missed events instead of disconnecting.
pub fn create_event_sse_stream(
    bus: &EventBus,
    battle_filter: Option<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = bus.subscribe();
    info!(
        "New SSE client connected (filter: {})",
        battle_filter.map(|id| id.to_string()).unwrap_or_else(|| "all".to_string())
    );

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("ConnectionStatus").data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(filter) = battle_filter {
                        if event.battle_id() != Some(filter) {
                            continue;
                        }
                    }
                    if let Some(sse_event) = to_sse_event(&event) {
                        yield Ok(sse_event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("SSE: client lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => {
                    info!("SSE: event bus closed, ending stream");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}

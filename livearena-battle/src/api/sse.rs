//! Server-Sent Events endpoints

use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use livearena_common::sse::create_event_sse_stream;
use std::convert::Infallible;
use uuid::Uuid;

use crate::error::Result;
use crate::AppState;

/// GET /events
///
/// Every event on the bus, including duet tip settlements.
pub async fn event_stream(State(state): State<AppState>) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    create_event_sse_stream(&state.event_bus, None)
}

/// GET /battles/:id/events
pub async fn battle_event_stream(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    // Unknown battles are a 404 rather than an empty stream
    state.battles.state(id).await?;
    Ok(create_event_sse_stream(&state.event_bus, Some(id)))
}

pub fn sse_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(event_stream))
        .route("/battles/:id/events", get(battle_event_stream))
}

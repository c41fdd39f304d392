//! Server-Sent Events for pipeline progress

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use nlinv_common::sse::create_event_sse_stream;
use std::convert::Infallible;

/// GET /events
///
/// Streams every `InventoryEvent`: transcription and generation progress,
/// applied updates, failures and cancellations.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    create_event_sse_stream("nlinv-im", &state.event_bus)
}

//! Server-Sent Events for analysis progress

use crate::AppState;
use axum::{
    extract::{Query, State},
    response::sse::{Event, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;

#[derive(Debug, Deserialize)]
pub struct EventFilter {
    /// Only stream events of this interview
    pub interview_id: Option<i64>,
}

/// GET /events[?interview_id=N]
pub async fn analysis_events(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    interview_common::sse::analysis_event_stream(&state.event_bus, filter.interview_id)
}

pub fn event_routes() -> Router<AppState> {
    Router::new().route("/events", get(analysis_events))
}

//! Server-Sent Events (SSE) utilities

use crate::events::{AnalysisEvent, EventBus};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

const HEARTBEAT_SECS: u64 = 15;

/// Stream analysis events as SSE
///
/// When `interview_filter` is set only that interview's events are forwarded.
/// Lagging subscribers skip the dropped events and keep streaming.
pub fn analysis_event_stream(
    event_bus: &EventBus,
    interview_filter: Option<i64>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(?interview_filter, "New SSE client connected to analysis events");

    let mut rx = event_bus.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(id) = interview_filter {
                        if event.interview_id() != id {
                            continue;
                        }
                    }
                    if let Some(sse_event) = to_sse_event(&event) {
                        yield Ok(sse_event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "SSE: subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => {
                    debug!("SSE: event bus closed");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(HEARTBEAT_SECS))
            .text("heartbeat"),
    )
}

fn to_sse_event(event: &AnalysisEvent) -> Option<Event> {
    let event_type = event.event_type();
    match serde_json::to_string(event) {
        Ok(json) => {
            debug!("SSE: Broadcasting analysis event: {}", event_type);
            Some(Event::default().event(event_type).data(json))
        }
        Err(e) => {
            warn!("SSE: Failed to serialize event {}: {}", event_type, e);
            None
        }
    }
}

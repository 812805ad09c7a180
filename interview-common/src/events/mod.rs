//! Event types for the analysis event system
//!
//! Provides the shared event definitions and the broadcast EventBus.

mod analysis_types;

pub use analysis_types::VideoAnalysisState;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Analysis pipeline events
///
/// Broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AnalysisEvent {
    /// A video moved to a new pipeline state
    VideoStateChanged {
        interview_id: i64,
        /// None until the Video row exists (UPLOADED, TRANSCODED)
        video_id: Option<i64>,
        question_id: i64,
        state: VideoAnalysisState,
        timestamp: DateTime<Utc>,
    },

    /// A video's pipeline run aborted
    VideoAnalysisFailed {
        interview_id: i64,
        video_id: Option<i64>,
        /// Last state reached before the failure
        last_state: VideoAnalysisState,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Interview summary was recomputed and written
    InterviewSummaryUpdated {
        interview_id: i64,
        analyzed_videos: usize,
        has_comparison: bool,
        timestamp: DateTime<Utc>,
    },
}

impl AnalysisEvent {
    /// Event type name (used as the SSE event field)
    pub fn event_type(&self) -> &str {
        match self {
            AnalysisEvent::VideoStateChanged { .. } => "VideoStateChanged",
            AnalysisEvent::VideoAnalysisFailed { .. } => "VideoAnalysisFailed",
            AnalysisEvent::InterviewSummaryUpdated { .. } => "InterviewSummaryUpdated",
        }
    }

    /// Interview the event belongs to
    pub fn interview_id(&self) -> i64 {
        match self {
            AnalysisEvent::VideoStateChanged { interview_id, .. }
            | AnalysisEvent::VideoAnalysisFailed { interview_id, .. }
            | AnalysisEvent::InterviewSummaryUpdated { interview_id, .. } => *interview_id,
        }
    }
}

/// Broadcast bus for analysis events
///
/// Cloning shares the same underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AnalysisEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: AnalysisEvent,
    ) -> Result<usize, broadcast::error::SendError<AnalysisEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: AnalysisEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_event(state: VideoAnalysisState) -> AnalysisEvent {
        AnalysisEvent::VideoStateChanged {
            interview_id: 7,
            video_id: Some(3),
            question_id: 11,
            state,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_emit_without_subscribers_fails_but_lossy_does_not() {
        let bus = EventBus::new(10);
        assert!(bus.emit(state_event(VideoAnalysisState::Saved)).is_err());
        bus.emit_lossy(state_event(VideoAnalysisState::Saved));
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.capacity(), 10);
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit_lossy(state_event(VideoAnalysisState::Transcribed));
        bus.emit_lossy(state_event(VideoAnalysisState::Scored));

        for expected in [VideoAnalysisState::Transcribed, VideoAnalysisState::Scored] {
            match rx.recv().await.unwrap() {
                AnalysisEvent::VideoStateChanged { state, .. } => assert_eq!(state, expected),
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = AnalysisEvent::InterviewSummaryUpdated {
            interview_id: 4,
            analyzed_videos: 3,
            has_comparison: false,
            timestamp: Utc::now(),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "InterviewSummaryUpdated");
        assert_eq!(json["analyzed_videos"], 3);
        assert_eq!(event.event_type(), "InterviewSummaryUpdated");
        assert_eq!(event.interview_id(), 4);
    }
}

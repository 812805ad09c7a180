//! Analysis gateway
//!
//! Typed contract to the four external analysis services (speech-to-text,
//! emotion, vision, LLM). The orchestrator only sees `AnalysisGateway`; the
//! HTTP implementation lives in `http`.

mod http;

pub use http::HttpAnalysisGateway;

use crate::models::CalibrationRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;

/// Analysis service call errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Network error calling {endpoint}: {reason}")]
    Network { endpoint: String, reason: String },

    #[error("Timed out calling {endpoint}")]
    Timeout { endpoint: String },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Unparseable response from {endpoint}: {reason}")]
    Parse { endpoint: String, reason: String },

    #[error("Cannot read {path} for upload: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Speech-to-text output
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    /// Word/segment timing as returned by the service
    pub timeline: Value,
}

impl Transcript {
    /// Timeline as JSON text, the form the LLM endpoints expect
    pub fn timeline_json(&self) -> String {
        match &self.timeline {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Emotion analysis of a video
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionReport {
    pub average_score: Option<f64>,
    /// Full response body, stored verbatim
    pub raw: Value,
}

/// Gaze/head-pose analysis of a video
#[derive(Debug, Clone, PartialEq)]
pub struct VisionReport {
    pub average_score: Option<f64>,
    /// Full response body, stored verbatim
    pub raw: Value,
}

/// LLM grading of one answer
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerScore {
    pub score: Option<f64>,
    /// Every field of the response object
    pub fields: Map<String, Value>,
}

/// Per-video narrative from the `/overall` endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct OverallNarrative {
    pub overall: Value,
}

/// Baseline returned by the calibration endpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationValues {
    pub gaze_yaw: f64,
    pub gaze_pitch: f64,
    pub head_yaw: f64,
    pub head_pitch: f64,
}

/// One analyzed video as sent to the cross-video aggregation endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub overall: String,
    pub score: f64,
    pub emotion_avg: f64,
    pub vision_avg: f64,
}

/// Interview-level averages used for interview-to-interview comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterviewStats {
    pub emotion_avg: f64,
    pub vision_avg: f64,
    pub score_avg: f64,
}

/// Calls to the external analysis services
///
/// Every call is a single attempt; failures surface as `GatewayError`.
#[async_trait]
pub trait AnalysisGateway: Send + Sync {
    /// Speech-to-text on an audio file
    async fn transcribe(&self, audio: &Path) -> Result<Transcript, GatewayError>;

    /// Facial emotion analysis on a video
    async fn analyze_emotion(&self, video: &Path) -> Result<EmotionReport, GatewayError>;

    /// Gaze/head-pose analysis relative to a calibration baseline
    async fn analyze_vision(
        &self,
        video: &Path,
        calibration: &CalibrationRecord,
    ) -> Result<VisionReport, GatewayError>;

    /// LLM grading of one answer; `timeline` is JSON text
    async fn score_answer(
        &self,
        question: &str,
        answer: &str,
        timeline: &str,
    ) -> Result<AnswerScore, GatewayError>;

    /// Per-video narrative from timeline, emotion and vision JSON text
    async fn aggregate_overall(
        &self,
        timeline: &str,
        emotion: &str,
        vision: &str,
    ) -> Result<OverallNarrative, GatewayError>;

    /// Interview narrative across analyzed videos
    ///
    /// `interview_id` is used for logging only; it is not sent.
    async fn aggregate_across_videos(
        &self,
        summaries: &[VideoSummary],
        interview_id: i64,
    ) -> Result<String, GatewayError>;

    /// Narrative comparing two interviews' averages
    async fn compare_interviews(
        &self,
        previous: &InterviewStats,
        current: &InterviewStats,
    ) -> Result<String, GatewayError>;

    /// Derive a gaze/head-pose baseline from a short video
    async fn calibrate(&self, video: &Path) -> Result<CalibrationValues, GatewayError>;

    /// Interview questions generated from résumé text
    async fn generate_questions(&self, resume_text: &str) -> Result<Vec<String>, GatewayError>;
}

/// Read a number that may arrive as a JSON number or numeric string
pub fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl EmotionReport {
    pub fn from_value(raw: Value) -> Self {
        let average_score = raw.get("average_score").and_then(lenient_f64);
        Self { average_score, raw }
    }
}

impl VisionReport {
    pub fn from_value(raw: Value) -> Self {
        let average_score = raw.get("average_score").and_then(lenient_f64);
        Self { average_score, raw }
    }
}

impl AnswerScore {
    /// Fails unless the response is a JSON object
    pub fn from_value(raw: Value) -> Result<Self, String> {
        match raw {
            Value::Object(fields) => Ok(Self {
                score: fields.get("score").and_then(lenient_f64),
                fields,
            }),
            other => Err(format!("expected a JSON object, got {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_number_forms() {
        assert_eq!(lenient_f64(&json!(0.7)), Some(0.7));
        assert_eq!(lenient_f64(&json!("85")), Some(85.0));
        assert_eq!(lenient_f64(&json!(" 1.5 ")), Some(1.5));
        assert_eq!(lenient_f64(&json!("high")), None);
        assert_eq!(lenient_f64(&json!(null)), None);
    }

    #[test]
    fn test_answer_score_requires_object() {
        let score = AnswerScore::from_value(json!({"score": "80", "feedback": "ok"})).unwrap();
        assert_eq!(score.score, Some(80.0));
        assert_eq!(score.fields["feedback"], "ok");

        assert!(AnswerScore::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn test_timeline_json_keeps_string_timelines_verbatim() {
        let transcript = Transcript {
            text: "hello".into(),
            timeline: json!("[{\"t\":0}]"),
        };
        assert_eq!(transcript.timeline_json(), "[{\"t\":0}]");

        let transcript = Transcript {
            text: "hello".into(),
            timeline: json!([{"t": 0}]),
        };
        assert_eq!(transcript.timeline_json(), "[{\"t\":0}]");
    }
}

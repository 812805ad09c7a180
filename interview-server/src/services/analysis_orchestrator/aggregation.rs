//! Interview-level aggregation
//!
//! Once an interview has at least `aggregation_threshold` analyzed videos,
//! every further SAVED recomputes its summary: an across-video narrative
//! plus, when the owner has another interview, a comparison against it.
//! Check-and-write is serialized per interview.

use super::AnalysisOrchestrator;
use crate::db;
use crate::error::PipelineError;
use crate::models::{AnalysisRecord, InterviewSummary};
use crate::services::analysis_gateway::{
    AnswerScore, EmotionReport, InterviewStats, VideoSummary, VisionReport,
};
use chrono::Utc;
use interview_common::events::AnalysisEvent;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per interview id
///
/// Entries live only while some task holds or waits for the lock.
#[derive(Default)]
pub struct InterviewLocks {
    locks: Arc<StdMutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

/// Held for the duration of one interview's check-and-write
pub struct InterviewLockGuard {
    interview_id: i64,
    lock: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<StdMutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl InterviewLocks {
    pub async fn acquire(&self, interview_id: i64) -> InterviewLockGuard {
        let lock = match self.locks.lock() {
            Ok(mut locks) => Arc::clone(locks.entry(interview_id).or_default()),
            Err(poisoned) => Arc::clone(poisoned.into_inner().entry(interview_id).or_default()),
        };
        let guard = Arc::clone(&lock).lock_owned().await;

        InterviewLockGuard {
            interview_id,
            lock,
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Interviews currently holding or waiting for a lock
    pub fn tracked(&self) -> usize {
        match self.locks.lock() {
            Ok(locks) => locks.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

impl Drop for InterviewLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = match self.locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Map entry plus ours: nobody else is waiting
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.interview_id);
        }
    }
}

/// Reduce a stored analysis to the figures the aggregation endpoint needs
///
/// Malformed or missing values count as 0 and are logged; the video still
/// counts toward the averages.
pub fn summarize_analysis(record: &AnalysisRecord) -> VideoSummary {
    let video_id = record.video_id;
    let answer = match AnswerScore::from_value(parse_payload(video_id, "answer", &record.answer)) {
        Ok(answer) => Some(answer),
        Err(reason) => {
            tracing::warn!(video_id, reason = %reason, "Answer payload is not an object");
            None
        }
    };
    let emotion = EmotionReport::from_value(parse_payload(video_id, "emotion", &record.emotion));
    let vision = VisionReport::from_value(parse_payload(video_id, "vision", &record.vision));

    let overall = match answer.as_ref().and_then(|a| a.fields.get("overall")) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    VideoSummary {
        overall,
        score: or_zero(video_id, "score", answer.and_then(|a| a.score)),
        emotion_avg: or_zero(video_id, "emotion", emotion.average_score),
        vision_avg: or_zero(video_id, "vision", vision.average_score),
    }
}

/// Arithmetic means over the summaries; all zero when there are none
pub fn interview_stats(summaries: &[VideoSummary]) -> InterviewStats {
    if summaries.is_empty() {
        return InterviewStats {
            emotion_avg: 0.0,
            vision_avg: 0.0,
            score_avg: 0.0,
        };
    }

    let n = summaries.len() as f64;
    InterviewStats {
        emotion_avg: summaries.iter().map(|s| s.emotion_avg).sum::<f64>() / n,
        vision_avg: summaries.iter().map(|s| s.vision_avg).sum::<f64>() / n,
        score_avg: summaries.iter().map(|s| s.score).sum::<f64>() / n,
    }
}

fn parse_payload(video_id: i64, payload: &str, raw: &str) -> Value {
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(video_id, payload, error = %e, "Unparseable analysis payload");
            Value::Null
        }
    }
}

fn or_zero(video_id: i64, payload: &str, value: Option<f64>) -> f64 {
    match value {
        Some(v) => v,
        None => {
            tracing::warn!(video_id, payload, "Missing or non-numeric value, using 0");
            0.0
        }
    }
}

impl AnalysisOrchestrator {
    /// Recompute and store the interview summary if the threshold is met
    ///
    /// Returns the written summary, or None when the interview has fewer
    /// analyzed videos than the threshold.
    pub async fn refresh_interview_summary(
        &self,
        interview_id: i64,
    ) -> Result<Option<InterviewSummary>, PipelineError> {
        let _guard = self.interview_locks.acquire(interview_id).await;

        let records = db::analyses::list_for_interview(&self.db, interview_id).await?;
        if records.len() < self.aggregation_threshold {
            tracing::debug!(
                interview_id,
                analyzed = records.len(),
                threshold = self.aggregation_threshold,
                "Aggregation threshold not reached"
            );
            return Ok(None);
        }

        let summaries: Vec<VideoSummary> = records.iter().map(summarize_analysis).collect();
        let overallcompare = self
            .gateway
            .aggregate_across_videos(&summaries, interview_id)
            .await?;

        let interview = db::interviews::require_interview(&self.db, interview_id).await?;
        let previous =
            db::interviews::find_previous_interview(&self.db, &interview.owner_id, interview_id)
                .await?;

        let comparison = match previous {
            Some(previous) => {
                let previous_records =
                    db::analyses::list_for_interview(&self.db, previous.interview_id).await?;
                let previous_summaries: Vec<VideoSummary> =
                    previous_records.iter().map(summarize_analysis).collect();

                let text = self
                    .gateway
                    .compare_interviews(
                        &interview_stats(&previous_summaries),
                        &interview_stats(&summaries),
                    )
                    .await?;
                tracing::debug!(
                    interview_id,
                    previous_interview_id = previous.interview_id,
                    "Compared against previous interview"
                );
                Some(text)
            }
            None => None,
        };

        let summary = InterviewSummary {
            overallcompare,
            comparison,
        };
        db::interviews::update_summary(&self.db, interview_id, &summary).await?;

        tracing::info!(
            interview_id,
            analyzed = records.len(),
            has_comparison = summary.comparison.is_some(),
            "Interview summary updated"
        );
        self.event_bus.emit_lossy(AnalysisEvent::InterviewSummaryUpdated {
            interview_id,
            analyzed_videos: records.len(),
            has_comparison: summary.comparison.is_some(),
            timestamp: Utc::now(),
        });

        Ok(Some(summary))
    }
}

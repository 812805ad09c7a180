//! Analysis orchestrator
//!
//! Drives one uploaded video through the pipeline:
//!
//! ```text
//! UPLOADED → TRANSCODED → PERSISTED     (synchronous, inside the upload request)
//!          → AUDIO_EXTRACTED → TRANSCRIBED → SCORED → SAVED   (background task)
//! ```
//!
//! After every SAVED the interview-level aggregation check runs (see
//! `aggregation`). Background runs are bounded by a semaphore.

mod aggregation;

pub use aggregation::{interview_stats, summarize_analysis, InterviewLockGuard, InterviewLocks};

use crate::db;
use crate::error::PipelineError;
use crate::models::{AnalysisRecord, Video};
use crate::services::analysis_gateway::{AnalysisGateway, AnswerScore, OverallNarrative};
use crate::services::artifact_store::ArtifactStore;
use crate::services::media_transcoder::{discard_temp, MediaToolkit};
use chrono::Utc;
use interview_common::config::PipelineConfig;
use interview_common::events::{AnalysisEvent, EventBus, VideoAnalysisState};
use serde_json::Value;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempPath;
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinHandle;

/// Coordinates media processing, analysis calls and persistence
pub struct AnalysisOrchestrator {
    db: SqlitePool,
    media: Arc<dyn MediaToolkit>,
    store: Arc<ArtifactStore>,
    gateway: Arc<dyn AnalysisGateway>,
    event_bus: EventBus,
    aggregation_threshold: usize,
    analysis_permits: Arc<Semaphore>,
    interview_locks: InterviewLocks,
    last_error: Arc<RwLock<Option<String>>>,
}

impl AnalysisOrchestrator {
    pub fn new(
        db: SqlitePool,
        media: Arc<dyn MediaToolkit>,
        store: Arc<ArtifactStore>,
        gateway: Arc<dyn AnalysisGateway>,
        event_bus: EventBus,
        pipeline: &PipelineConfig,
    ) -> Self {
        Self {
            db,
            media,
            store,
            gateway,
            event_bus,
            aggregation_threshold: pipeline.aggregation_threshold.max(1),
            analysis_permits: Arc::new(Semaphore::new(pipeline.max_concurrent_analyses.max(1))),
            interview_locks: InterviewLocks::default(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Most recent background failure, shared with the health endpoint
    pub fn last_error(&self) -> Arc<RwLock<Option<String>>> {
        Arc::clone(&self.last_error)
    }

    /// Ingest an upload and schedule its analysis
    ///
    /// Returns once the video is persisted; analysis continues in the
    /// background.
    pub async fn process_upload(
        self: &Arc<Self>,
        interview_id: i64,
        question_id: i64,
        upload: TempPath,
    ) -> Result<Video, PipelineError> {
        let video = self.ingest_upload(interview_id, question_id, upload).await?;
        self.spawn_analysis(video.clone());
        Ok(video)
    }

    /// UPLOADED → TRANSCODED → PERSISTED
    ///
    /// The upload temp file is always deleted. On failure no Video row is
    /// written and any persisted artifacts are removed.
    pub async fn ingest_upload(
        &self,
        interview_id: i64,
        question_id: i64,
        upload: TempPath,
    ) -> Result<Video, PipelineError> {
        let size = match tokio::fs::metadata(&upload).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };
        if size == 0 {
            discard_temp(upload);
            return Err(PipelineError::Validation("Uploaded video is empty".to_string()));
        }

        let resolved = async {
            db::interviews::require_interview(&self.db, interview_id).await?;
            db::questions::require_question(&self.db, question_id).await
        }
        .await;
        if let Err(e) = resolved {
            discard_temp(upload);
            return Err(e.into());
        }

        self.emit_state(interview_id, None, question_id, VideoAnalysisState::Uploaded);
        tracing::info!(interview_id, question_id, bytes = size, "Ingesting uploaded video");

        let mut reached = VideoAnalysisState::Uploaded;
        match self
            .persist_upload(interview_id, question_id, upload, &mut reached)
            .await
        {
            Ok(video) => Ok(video),
            Err(e) => {
                self.report_failure(interview_id, None, reached, &e).await;
                Err(e)
            }
        }
    }

    async fn persist_upload(
        &self,
        interview_id: i64,
        question_id: i64,
        upload: TempPath,
        reached: &mut VideoAnalysisState,
    ) -> Result<Video, PipelineError> {
        let converted = self.media.transcode(upload).await?;
        *reached = VideoAnalysisState::Transcoded;
        self.emit_state(interview_id, None, question_id, VideoAnalysisState::Transcoded);

        let stored = self.store.persist(&converted).await?;

        let derived = async {
            let thumbnail = self.media.extract_thumbnail(&stored).await?;
            let frames = self.media.count_frames(&stored).await?;
            Ok::<_, PipelineError>((thumbnail, frames))
        }
        .await;

        let (thumbnail, frames) = match derived {
            Ok(derived) => derived,
            Err(e) => {
                remove_artifact(&stored).await;
                remove_artifact(&stored.with_extension("png")).await;
                return Err(e);
            }
        };

        let video = db::videos::record_upload(
            &self.db,
            interview_id,
            question_id,
            &stored.display().to_string(),
            &thumbnail.display().to_string(),
            i64::try_from(frames).unwrap_or(i64::MAX),
        )
        .await;

        let video = match video {
            Ok(video) => video,
            Err(e) => {
                remove_artifact(&stored).await;
                remove_artifact(&thumbnail).await;
                return Err(e.into());
            }
        };

        *reached = VideoAnalysisState::Persisted;
        self.emit_state(
            interview_id,
            Some(video.video_id),
            question_id,
            VideoAnalysisState::Persisted,
        );
        tracing::info!(
            interview_id,
            video_id = video.video_id,
            frames,
            path = %stored.display(),
            "Video persisted"
        );

        Ok(video)
    }

    /// Run `analyze_video` on a background task, bounded by the permit pool
    pub fn spawn_analysis(self: &Arc<Self>, video: Video) -> JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            let _permit = match Arc::clone(&orchestrator.analysis_permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::error!(video_id = video.video_id, error = %e, "Analysis pool closed");
                    return;
                }
            };

            tracing::info!(video_id = video.video_id, "Background analysis task started");
            match orchestrator.analyze_video(&video).await {
                Ok(_) => tracing::info!(
                    video_id = video.video_id,
                    "Background analysis task completed successfully"
                ),
                Err(e) => tracing::error!(
                    video_id = video.video_id,
                    error = %e,
                    "Background analysis task failed"
                ),
            }
        })
    }

    /// PERSISTED → AUDIO_EXTRACTED → TRANSCRIBED → SCORED → SAVED, then the
    /// aggregation check
    ///
    /// Fails with `Configuration` before any gateway call when the interview
    /// has no calibration.
    pub async fn analyze_video(&self, video: &Video) -> Result<AnalysisRecord, PipelineError> {
        let mut reached = VideoAnalysisState::Persisted;
        let record = match self.run_analysis(video, &mut reached).await {
            Ok(record) => record,
            Err(e) => {
                self.report_failure(video.interview_id, Some(video.video_id), reached, &e)
                    .await;
                return Err(e);
            }
        };

        if let Err(e) = self.refresh_interview_summary(video.interview_id).await {
            tracing::error!(
                interview_id = video.interview_id,
                error = %e,
                "Interview aggregation failed"
            );
            *self.last_error.write().await = Some(format!(
                "aggregation for interview {}: {}",
                video.interview_id, e
            ));
        }

        Ok(record)
    }

    async fn run_analysis(
        &self,
        video: &Video,
        reached: &mut VideoAnalysisState,
    ) -> Result<AnalysisRecord, PipelineError> {
        let stored = video.stored_path.as_deref().ok_or_else(|| {
            PipelineError::Validation(format!("Video {} has no recording", video.video_id))
        })?;
        let stored = Path::new(stored);

        let question = db::questions::require_question(&self.db, video.question_id).await?;
        let calibration = db::calibrations::find_for_interview(&self.db, video.interview_id)
            .await?
            .ok_or_else(|| {
                PipelineError::Configuration(format!(
                    "Interview {} has not been calibrated",
                    video.interview_id
                ))
            })?;

        let audio = self.media.extract_audio_track(stored).await?;
        self.advance(video, reached, VideoAnalysisState::AudioExtracted);

        let transcript = self.gateway.transcribe(&audio).await?;
        self.advance(video, reached, VideoAnalysisState::Transcribed);

        let timeline = transcript.timeline_json();
        let (emotion, vision, score) = tokio::try_join!(
            self.gateway.analyze_emotion(stored),
            self.gateway.analyze_vision(stored, &calibration),
            self.gateway
                .score_answer(&question.text, &transcript.text, &timeline),
        )?;

        let emotion_json = emotion.raw.to_string();
        let vision_json = vision.raw.to_string();
        let narrative = self
            .gateway
            .aggregate_overall(&timeline, &emotion_json, &vision_json)
            .await?;
        self.advance(video, reached, VideoAnalysisState::Scored);

        let record = AnalysisRecord {
            video_id: video.video_id,
            vision: vision_json,
            emotion: emotion_json,
            answer: merge_answer(score, narrative),
        };
        db::analyses::insert_analysis(&self.db, &record).await?;
        self.advance(video, reached, VideoAnalysisState::Saved);

        Ok(record)
    }

    fn advance(&self, video: &Video, reached: &mut VideoAnalysisState, next: VideoAnalysisState) {
        *reached = next;
        tracing::debug!(video_id = video.video_id, state = %next, "Video state changed");
        self.emit_state(
            video.interview_id,
            Some(video.video_id),
            video.question_id,
            next,
        );
    }

    fn emit_state(
        &self,
        interview_id: i64,
        video_id: Option<i64>,
        question_id: i64,
        state: VideoAnalysisState,
    ) {
        self.event_bus.emit_lossy(AnalysisEvent::VideoStateChanged {
            interview_id,
            video_id,
            question_id,
            state,
            timestamp: Utc::now(),
        });
    }

    async fn report_failure(
        &self,
        interview_id: i64,
        video_id: Option<i64>,
        last_state: VideoAnalysisState,
        error: &PipelineError,
    ) {
        tracing::error!(
            interview_id,
            video_id,
            last_state = %last_state,
            error = %error,
            "Video pipeline failed"
        );
        *self.last_error.write().await = Some(error.to_string());
        self.event_bus.emit_lossy(AnalysisEvent::VideoAnalysisFailed {
            interview_id,
            video_id,
            last_state,
            error: error.to_string(),
            timestamp: Utc::now(),
        });
    }
}

/// LLM score object with the per-video narrative under `"overall"`
pub fn merge_answer(score: AnswerScore, narrative: OverallNarrative) -> String {
    let mut fields = score.fields;
    fields.insert("overall".to_string(), narrative.overall);
    Value::Object(fields).to_string()
}

async fn remove_artifact(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove artifact");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_overwrites_existing_overall() {
        let score = AnswerScore::from_value(json!({"score": 72, "overall": "stale"})).unwrap();
        let narrative = OverallNarrative {
            overall: json!("clear and confident"),
        };

        let merged: Value = serde_json::from_str(&merge_answer(score, narrative)).unwrap();
        assert_eq!(merged, json!({"score": 72, "overall": "clear and confident"}));
    }
}

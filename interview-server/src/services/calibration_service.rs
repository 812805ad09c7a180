//! Synchronous calibration of an interview's gaze/head-pose baseline

use crate::db;
use crate::error::PipelineError;
use crate::models::CalibrationRecord;
use crate::services::analysis_gateway::AnalysisGateway;
use crate::services::media_transcoder::{discard_temp, MediaToolkit};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempPath;

pub struct CalibrationService {
    db: SqlitePool,
    media: Arc<dyn MediaToolkit>,
    gateway: Arc<dyn AnalysisGateway>,
}

impl CalibrationService {
    pub fn new(
        db: SqlitePool,
        media: Arc<dyn MediaToolkit>,
        gateway: Arc<dyn AnalysisGateway>,
    ) -> Self {
        Self { db, media, gateway }
    }

    /// Transcode, calibrate and store; replaces any earlier calibration
    ///
    /// The upload and the transcoded MP4 are deleted on every path.
    pub async fn calibrate(
        &self,
        interview_id: i64,
        upload: TempPath,
    ) -> Result<CalibrationRecord, PipelineError> {
        if let Err(e) = db::interviews::require_interview(&self.db, interview_id).await {
            discard_temp(upload);
            return Err(e.into());
        }

        let converted = self.media.transcode(upload).await?;
        let values = self.gateway.calibrate(&converted).await;
        remove_converted(&converted).await;
        let values = values?;

        let record = CalibrationRecord {
            interview_id,
            gaze_yaw: values.gaze_yaw,
            gaze_pitch: values.gaze_pitch,
            head_yaw: values.head_yaw,
            head_pitch: values.head_pitch,
        };
        db::calibrations::upsert_calibration(&self.db, &record).await?;

        tracing::info!(
            interview_id,
            gaze_yaw = record.gaze_yaw,
            gaze_pitch = record.gaze_pitch,
            head_yaw = record.head_yaw,
            head_pitch = record.head_pitch,
            "Calibration stored"
        );
        Ok(record)
    }
}

async fn remove_converted(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to delete calibration video");
    }
}

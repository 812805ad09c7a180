//! Read-side composition of interview and video reports
//!
//! Pure queries. Missing analysis or calibration yields nulls, never an
//! error: a video without analysis is simply still being analyzed.

use crate::db;
use crate::error::PipelineError;
use crate::models::{AnalysisRecord, CalibrationRecord, Interview, Question, Video};
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;

/// Where a video stands from a reader's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisStatus {
    /// Placeholder row; nothing uploaded yet
    NotRecorded,
    /// Uploaded, no analysis record (still running, or failed)
    Analyzing,
    Completed,
}

impl AnalysisStatus {
    fn of(video: &Video, analyzed: bool) -> Self {
        if video.is_placeholder() {
            AnalysisStatus::NotRecorded
        } else if analyzed {
            AnalysisStatus::Completed
        } else {
            AnalysisStatus::Analyzing
        }
    }
}

/// One row of the interview profile
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoListing {
    pub video_id: i64,
    pub thumbnail_path: Option<String>,
    pub question_id: i64,
    pub question_text: Option<String>,
    pub video_path: Option<String>,
    pub status: AnalysisStatus,
}

/// Interview metadata plus its videos
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewProfile {
    pub interview: Interview,
    pub videos: Vec<VideoListing>,
    pub analyzed_videos: usize,
    pub calibrated: bool,
}

/// Analysis payloads decoded for presentation
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisView {
    pub vision: Value,
    pub emotion: Value,
    pub answer: Value,
}

impl From<AnalysisRecord> for AnalysisView {
    fn from(record: AnalysisRecord) -> Self {
        Self {
            vision: decode_payload(record.vision),
            emotion: decode_payload(record.emotion),
            answer: decode_payload(record.answer),
        }
    }
}

/// Everything known about one video
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetail {
    pub video: Video,
    pub question: Option<Question>,
    pub analysis: Option<AnalysisView>,
    pub calibration: Option<CalibrationRecord>,
    pub streaming_url: String,
    pub status: AnalysisStatus,
}

/// Interview list entry with completion counts
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewOverview {
    pub interview: Interview,
    pub total_videos: usize,
    pub analyzed_videos: usize,
}

/// Streaming location of a stored video
pub fn streaming_url(video_id: i64) -> String {
    format!("/videos/stream/{}", video_id)
}

/// Interview metadata with every video (placeholders included)
pub async fn get_interview_profile(
    pool: &SqlitePool,
    interview_id: i64,
) -> Result<InterviewProfile, PipelineError> {
    let interview = db::interviews::require_interview(pool, interview_id).await?;
    let videos = db::videos::list_for_interview(pool, interview_id).await?;
    let analyzed: Vec<i64> = db::analyses::list_for_interview(pool, interview_id)
        .await?
        .into_iter()
        .map(|a| a.video_id)
        .collect();
    let calibrated = db::calibrations::find_for_interview(pool, interview_id)
        .await?
        .is_some();

    let mut question_texts: HashMap<i64, Option<String>> = HashMap::new();
    let mut listings = Vec::with_capacity(videos.len());
    for video in videos {
        if !question_texts.contains_key(&video.question_id) {
            let text = db::questions::find_question(pool, video.question_id)
                .await?
                .map(|q| q.text);
            question_texts.insert(video.question_id, text);
        }

        listings.push(VideoListing {
            video_id: video.video_id,
            thumbnail_path: video.thumbnail_path.clone(),
            question_id: video.question_id,
            question_text: question_texts.get(&video.question_id).cloned().flatten(),
            status: AnalysisStatus::of(&video, analyzed.contains(&video.video_id)),
            video_path: video.stored_path,
        });
    }

    Ok(InterviewProfile {
        interview,
        videos: listings,
        analyzed_videos: analyzed.len(),
        calibrated,
    })
}

/// One video with its question, analysis and the interview's calibration
///
/// Fails with `Validation` when the video belongs to another interview.
pub async fn get_video_detail(
    pool: &SqlitePool,
    interview_id: i64,
    video_id: i64,
) -> Result<VideoDetail, PipelineError> {
    let video = db::videos::require_video(pool, video_id).await?;
    if video.interview_id != interview_id {
        return Err(PipelineError::Validation(format!(
            "Video {} does not belong to interview {}",
            video_id, interview_id
        )));
    }

    let question = db::questions::find_question(pool, video.question_id).await?;
    let analysis = db::analyses::find_for_video(pool, video_id).await?;
    let calibration = db::calibrations::find_for_interview(pool, interview_id).await?;

    Ok(VideoDetail {
        status: AnalysisStatus::of(&video, analysis.is_some()),
        streaming_url: streaming_url(video.video_id),
        question,
        analysis: analysis.map(AnalysisView::from),
        calibration,
        video,
    })
}

/// A user's interviews, newest first, with completion counts
pub async fn list_user_interviews(
    pool: &SqlitePool,
    owner_id: &str,
) -> Result<Vec<InterviewOverview>, PipelineError> {
    if db::users::find_user(pool, owner_id).await?.is_none() {
        return Err(PipelineError::NotFound(format!("User {}", owner_id)));
    }

    let interviews = db::interviews::list_for_owner(pool, owner_id).await?;
    let mut overviews = Vec::with_capacity(interviews.len());
    for interview in interviews {
        let total_videos = db::videos::list_for_interview(pool, interview.interview_id)
            .await?
            .iter()
            .filter(|v| !v.is_placeholder())
            .count();
        let analyzed_videos = db::analyses::list_for_interview(pool, interview.interview_id)
            .await?
            .len();
        overviews.push(InterviewOverview {
            interview,
            total_videos,
            analyzed_videos,
        });
    }

    Ok(overviews)
}

fn decode_payload(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InterviewKind;

    async fn seeded() -> (SqlitePool, Interview) {
        let pool = db::init_memory_pool().await.unwrap();
        db::users::create_user(&pool, "erin", "Erin", "erin@example.com", "pw")
            .await
            .unwrap();
        let interview = db::interviews::create_interview(&pool, "erin", None, InterviewKind::Real)
            .await
            .unwrap();
        (pool, interview)
    }

    #[tokio::test]
    async fn test_profile_reports_partial_state() {
        let (pool, interview) = seeded().await;
        let common = db::questions::list_visible_to(&pool, "erin").await.unwrap();

        let recorded = db::videos::record_upload(
            &pool,
            interview.interview_id,
            common[0].question_id,
            "/s/a.mp4",
            "/s/a.png",
            90,
        )
        .await
        .unwrap();
        db::videos::insert_placeholder(&pool, interview.interview_id, common[1].question_id)
            .await
            .unwrap();

        let profile = get_interview_profile(&pool, interview.interview_id).await.unwrap();
        assert_eq!(profile.videos.len(), 2);
        assert_eq!(profile.analyzed_videos, 0);
        assert!(!profile.calibrated);
        assert_eq!(profile.videos[0].video_id, recorded.video_id);
        assert_eq!(profile.videos[0].status, AnalysisStatus::Analyzing);
        assert_eq!(profile.videos[0].question_text.as_deref(), Some(common[0].text.as_str()));
        assert_eq!(profile.videos[1].status, AnalysisStatus::NotRecorded);
        assert!(profile.videos[1].video_path.is_none());
    }

    #[tokio::test]
    async fn test_detail_without_analysis_is_not_an_error() {
        let (pool, interview) = seeded().await;
        let question = &db::questions::list_visible_to(&pool, "erin").await.unwrap()[0];
        let video = db::videos::record_upload(
            &pool,
            interview.interview_id,
            question.question_id,
            "/s/b.mp4",
            "/s/b.png",
            30,
        )
        .await
        .unwrap();

        let detail = get_video_detail(&pool, interview.interview_id, video.video_id)
            .await
            .unwrap();
        assert!(detail.analysis.is_none());
        assert!(detail.calibration.is_none());
        assert_eq!(detail.status, AnalysisStatus::Analyzing);
        assert_eq!(detail.streaming_url, format!("/videos/stream/{}", video.video_id));
    }

    #[tokio::test]
    async fn test_detail_rejects_foreign_video() {
        let (pool, interview) = seeded().await;
        let other = db::interviews::create_interview(&pool, "erin", None, InterviewKind::Practice)
            .await
            .unwrap();
        let question = &db::questions::list_visible_to(&pool, "erin").await.unwrap()[0];
        let video = db::videos::record_upload(
            &pool,
            other.interview_id,
            question.question_id,
            "/s/c.mp4",
            "/s/c.png",
            30,
        )
        .await
        .unwrap();

        let err = get_video_detail(&pool, interview.interview_id, video.video_id)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));

        let err = get_video_detail(&pool, interview.interview_id, 9999)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }

    #[test]
    fn test_non_json_payload_is_kept_as_text() {
        assert_eq!(decode_payload("plain".into()), Value::String("plain".into()));
        assert_eq!(decode_payload("{\"a\":1}".into())["a"], 1);
    }
}

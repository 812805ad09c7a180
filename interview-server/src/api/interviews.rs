//! Interview lifecycle: start, calibrate, upload answers

use super::upload::spool_video;
use crate::db;
use crate::models::{CalibrationRecord, InterviewKind, Video};
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct StartInterviewRequest {
    pub owner_id: String,
    pub title: Option<String>,
    pub kind: String,
}

#[derive(Debug, Serialize)]
pub struct StartInterviewResponse {
    pub interview_id: i64,
}

/// Acknowledgement of an accepted answer video
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub video_id: i64,
    pub interview_id: i64,
    pub question_id: i64,
    pub frame_count: i64,
    /// Analysis continues in the background
    pub status: &'static str,
}

impl From<Video> for UploadResponse {
    fn from(video: Video) -> Self {
        Self {
            video_id: video.video_id,
            interview_id: video.interview_id,
            question_id: video.question_id,
            frame_count: video.frame_count,
            status: "ANALYZING",
        }
    }
}

/// POST /api/interviews
pub async fn start_interview(
    State(state): State<AppState>,
    Json(request): Json<StartInterviewRequest>,
) -> ApiResult<(StatusCode, Json<StartInterviewResponse>)> {
    let kind: InterviewKind = request.kind.parse().map_err(ApiError::BadRequest)?;

    if db::users::find_user(&state.db, &request.owner_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("User {}", request.owner_id)));
    }

    let title = request.title.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let interview = db::interviews::create_interview(&state.db, &request.owner_id, title, kind).await?;

    tracing::info!(
        interview_id = interview.interview_id,
        owner_id = %interview.owner_id,
        kind = %kind,
        "Interview started"
    );

    Ok((
        StatusCode::CREATED,
        Json(StartInterviewResponse {
            interview_id: interview.interview_id,
        }),
    ))
}

/// POST /api/interviews/{interview_id}/calibration
///
/// Synchronous: returns the stored baseline.
pub async fn calibrate_interview(
    State(state): State<AppState>,
    Path(interview_id): Path<i64>,
    mut multipart: Multipart,
) -> ApiResult<Json<CalibrationRecord>> {
    let upload = spool_video(&mut multipart, &state.scratch_dir).await?;
    let record = state.calibration.calibrate(interview_id, upload).await?;
    Ok(Json(record))
}

/// POST /api/interviews/{interview_id}/questions/{question_id}/video
///
/// Returns once the video is transcoded and persisted (202); analysis
/// runs in the background.
pub async fn upload_answer_video(
    State(state): State<AppState>,
    Path((interview_id, question_id)): Path<(i64, i64)>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let upload = spool_video(&mut multipart, &state.scratch_dir).await?;
    let video = state
        .orchestrator
        .process_upload(interview_id, question_id, upload)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(UploadResponse::from(video))))
}

pub fn interview_routes() -> Router<AppState> {
    Router::new()
        .route("/api/interviews", post(start_interview))
        .route(
            "/api/interviews/:interview_id/calibration",
            post(calibrate_interview),
        )
        .route(
            "/api/interviews/:interview_id/questions/:question_id/video",
            post(upload_answer_video),
        )
}

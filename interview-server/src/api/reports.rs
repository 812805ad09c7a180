//! Interview profile and video detail reads

use crate::services::report_assembler::{self, InterviewProfile, VideoDetail};
use crate::{ApiResult, AppState};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

/// GET /api/interviews/{interview_id}/profile
pub async fn interview_profile(
    State(state): State<AppState>,
    Path(interview_id): Path<i64>,
) -> ApiResult<Json<InterviewProfile>> {
    let profile = report_assembler::get_interview_profile(&state.db, interview_id).await?;
    Ok(Json(profile))
}

/// GET /api/interviews/{interview_id}/videos/{video_id}
pub async fn video_detail(
    State(state): State<AppState>,
    Path((interview_id, video_id)): Path<(i64, i64)>,
) -> ApiResult<Json<VideoDetail>> {
    let detail = report_assembler::get_video_detail(&state.db, interview_id, video_id).await?;
    Ok(Json(detail))
}

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/api/interviews/:interview_id/profile", get(interview_profile))
        .route(
            "/api/interviews/:interview_id/videos/:video_id",
            get(video_detail),
        )
}

//! Custom and résumé question endpoints

use crate::models::{Question, Video};
use crate::services::ResumeQuestionOutcome;
use crate::{ApiResult, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CustomQuestionRequest {
    pub owner_id: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CustomQuestionResponse {
    pub question: Question,
    pub video: Video,
}

#[derive(Debug, Deserialize)]
pub struct ResumeRequest {
    pub owner_id: String,
    pub title: Option<String>,
    pub resume_text: String,
}

/// POST /api/interviews/{interview_id}/questions
pub async fn create_custom_question(
    State(state): State<AppState>,
    Path(interview_id): Path<i64>,
    Json(request): Json<CustomQuestionRequest>,
) -> ApiResult<(StatusCode, Json<CustomQuestionResponse>)> {
    let (question, video) = state
        .questions
        .create_custom(interview_id, &request.owner_id, &request.text)
        .await?;
    Ok((StatusCode::CREATED, Json(CustomQuestionResponse { question, video })))
}

/// POST /api/interviews/{interview_id}/resume
pub async fn generate_resume_questions(
    State(state): State<AppState>,
    Path(interview_id): Path<i64>,
    Json(request): Json<ResumeRequest>,
) -> ApiResult<Json<ResumeQuestionOutcome>> {
    let outcome = state
        .questions
        .generate_from_resume(
            interview_id,
            &request.owner_id,
            request.title.as_deref(),
            &request.resume_text,
        )
        .await?;
    Ok(Json(outcome))
}

/// DELETE /api/questions/{question_id}
pub async fn delete_question(
    State(state): State<AppState>,
    Path(question_id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.questions.delete(question_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn question_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/interviews/:interview_id/questions",
            post(create_custom_question),
        )
        .route(
            "/api/interviews/:interview_id/resume",
            post(generate_resume_questions),
        )
        .route("/api/questions/:question_id", delete(delete_question))
}

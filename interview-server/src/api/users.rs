//! User registration and per-user listings

use crate::db;
use crate::models::{Question, User};
use crate::services::report_assembler::{self, InterviewOverview};
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub password: String,
}

/// POST /api/users
///
/// 400 on blank fields, 409 when the id is taken.
pub async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<RegisterUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user_id = request.user_id.trim();
    if user_id.is_empty() || request.password.is_empty() {
        return Err(ApiError::BadRequest(
            "user_id and password are required".to_string(),
        ));
    }

    if db::users::find_user(&state.db, user_id).await?.is_some() {
        return Err(ApiError::Conflict(format!("User id already taken: {}", user_id)));
    }

    let user = db::users::create_user(
        &state.db,
        user_id,
        request.display_name.trim(),
        request.email.trim(),
        &request.password,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users/{user_id}/interviews
pub async fn list_interviews(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<InterviewOverview>>> {
    let interviews = report_assembler::list_user_interviews(&state.db, &user_id).await?;
    Ok(Json(interviews))
}

/// GET /api/users/{user_id}/questions
pub async fn list_questions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Question>>> {
    let questions = state.questions.list_for_user(&user_id).await?;
    Ok(Json(questions))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", post(register_user))
        .route("/api/users/:user_id/interviews", get(list_interviews))
        .route("/api/users/:user_id/questions", get(list_questions))
}

//! Error types for interview-server
//!
//! `PipelineError` is the orchestration-level error returned by services.
//! `ApiError` is what HTTP handlers return; it owns the status mapping.

use crate::services::analysis_gateway::GatewayError;
use crate::services::artifact_store::StorageError;
use crate::services::media_transcoder::MediaError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors raised while ingesting, analyzing or reporting on interview videos
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Caller supplied unusable input (empty upload, blank text, wrong owner)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced interview, question or video does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transcoding, thumbnailing, frame counting or audio extraction failed
    #[error("Media processing error: {0}")]
    MediaProcessing(#[from] MediaError),

    /// A prerequisite record is missing (e.g. interview never calibrated)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An analysis service call failed
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Artifact store could not persist a file
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Database access failed
    #[error("Database error: {0}")]
    Database(String),
}

impl From<interview_common::Error> for PipelineError {
    fn from(err: interview_common::Error) -> Self {
        match err {
            interview_common::Error::NotFound(msg) => PipelineError::NotFound(msg),
            interview_common::Error::InvalidInput(msg) => PipelineError::Validation(msg),
            other => PipelineError::Database(other.to_string()),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - duplicate user, missing calibration
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// interview-common error
    #[error("Common error: {0}")]
    Common(#[from] interview_common::Error),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(msg) => ApiError::BadRequest(msg),
            PipelineError::NotFound(msg) => ApiError::NotFound(msg),
            PipelineError::Configuration(msg) => ApiError::Conflict(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => match err {
                interview_common::Error::NotFound(msg) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone())
                }
                interview_common::Error::InvalidInput(msg) => {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone())
                }
                other => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "COMMON_ERROR",
                    other.to_string(),
                ),
            },
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

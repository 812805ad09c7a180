//! interview-server library interface
//!
//! Exposes the router, state and services for the binary and for
//! integration tests.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult, PipelineError};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use interview_common::config::PipelineConfig;
use interview_common::events::EventBus;
use services::{
    AnalysisGateway, AnalysisOrchestrator, ArtifactStore, CalibrationService, MediaToolkit,
    QuestionService,
};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Largest accepted upload body
pub const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// External collaborators the pipeline is built from
pub struct PipelineDeps {
    pub media: Arc<dyn MediaToolkit>,
    pub gateway: Arc<dyn AnalysisGateway>,
    pub store: Arc<ArtifactStore>,
    /// Where multipart uploads are spooled before transcoding
    pub scratch_dir: PathBuf,
    pub pipeline: PipelineConfig,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub calibration: Arc<CalibrationService>,
    pub questions: Arc<QuestionService>,
    pub scratch_dir: PathBuf,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last background pipeline failure, for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, deps: PipelineDeps) -> Self {
        let orchestrator = Arc::new(AnalysisOrchestrator::new(
            db.clone(),
            Arc::clone(&deps.media),
            deps.store,
            Arc::clone(&deps.gateway),
            event_bus.clone(),
            &deps.pipeline,
        ));
        let calibration = Arc::new(CalibrationService::new(
            db.clone(),
            deps.media,
            Arc::clone(&deps.gateway),
        ));
        let questions = Arc::new(QuestionService::new(db.clone(), deps.gateway));

        Self {
            last_error: orchestrator.last_error(),
            db,
            event_bus,
            orchestrator,
            calibration,
            questions,
            scratch_dir: deps.scratch_dir,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::user_routes())
        .merge(api::interview_routes())
        .merge(api::question_routes())
        .merge(api::report_routes())
        .merge(api::health_routes())
        .merge(api::event_routes())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

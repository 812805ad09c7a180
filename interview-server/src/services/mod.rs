//! Services for interview-server

pub mod analysis_gateway;
pub mod analysis_orchestrator;
pub mod artifact_store;
pub mod calibration_service;
pub mod media_transcoder;
pub mod question_service;
pub mod report_assembler;

pub use analysis_gateway::{AnalysisGateway, GatewayError, HttpAnalysisGateway};
pub use analysis_orchestrator::AnalysisOrchestrator;
pub use artifact_store::{ArtifactStore, StorageError};
pub use calibration_service::CalibrationService;
pub use media_transcoder::{FfmpegToolkit, MediaError, MediaToolkit};
pub use question_service::{QuestionService, ResumeQuestionOutcome};

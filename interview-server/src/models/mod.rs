//! Data models for interview-server
//!
//! Entities of the mock-interview domain: users, interviews, questions,
//! recorded videos, their analysis records and per-interview calibration.

pub mod analysis;
pub mod calibration;
pub mod interview;
pub mod question;
pub mod user;
pub mod video;

pub use analysis::AnalysisRecord;
pub use calibration::CalibrationRecord;
pub use interview::{Interview, InterviewKind, InterviewSummary};
pub use question::{Question, QuestionKind};
pub use user::User;
pub use video::Video;

//! Gaze/head-pose calibration baseline

use serde::{Deserialize, Serialize};

/// Per-interview calibration baseline
///
/// At most one record exists per interview; recalibrating replaces it.
/// Vision analysis cannot run without it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub interview_id: i64,
    pub gaze_yaw: f64,
    pub gaze_pitch: f64,
    pub head_yaw: f64,
    pub head_pitch: f64,
}

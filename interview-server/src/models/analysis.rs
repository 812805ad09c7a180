//! Per-video analysis results

use serde::{Deserialize, Serialize};

/// Stored analysis of one video
///
/// All three payloads are kept as the raw JSON text produced by the
/// analysis services. `answer` is the LLM score object with the overall
/// narrative merged in under `"overall"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub video_id: i64,
    pub vision: String,
    pub emotion: String,
    pub answer: String,
}

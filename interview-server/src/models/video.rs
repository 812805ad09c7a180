//! Recorded answer videos

use serde::{Deserialize, Serialize};

/// One recorded answer to one question within an interview
///
/// Custom and résumé questions create a placeholder row with no stored
/// path; the first upload for that question fills it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub video_id: i64,
    pub interview_id: i64,
    pub question_id: i64,
    pub stored_path: Option<String>,
    pub thumbnail_path: Option<String>,
    pub frame_count: i64,
}

impl Video {
    /// True while no recording has been uploaded for this row
    pub fn is_placeholder(&self) -> bool {
        self.stored_path.is_none()
    }
}

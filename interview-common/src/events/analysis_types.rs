//! Video analysis pipeline state types

use serde::{Deserialize, Serialize};

/// Per-video pipeline state
///
/// UPLOADED → TRANSCODED → PERSISTED → AUDIO_EXTRACTED → TRANSCRIBED → SCORED → SAVED
///
/// States only move forward; a failure ends the run in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VideoAnalysisState {
    /// Raw upload written to scratch space
    Uploaded,
    /// Normalized MP4 produced
    Transcoded,
    /// MP4 moved to durable storage, Video row flushed
    Persisted,
    /// Audio track extracted from the persisted video
    AudioExtracted,
    /// Speech-to-text completed
    Transcribed,
    /// Emotion, vision, LLM score and overall narrative merged
    Scored,
    /// AnalysisRecord persisted
    Saved,
    /// Run aborted
    Failed,
}

impl VideoAnalysisState {
    /// Next state in the happy path (None for terminal states)
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Uploaded => Some(Self::Transcoded),
            Self::Transcoded => Some(Self::Persisted),
            Self::Persisted => Some(Self::AudioExtracted),
            Self::AudioExtracted => Some(Self::Transcribed),
            Self::Transcribed => Some(Self::Scored),
            Self::Scored => Some(Self::Saved),
            Self::Saved | Self::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Saved | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uploaded => "UPLOADED",
            Self::Transcoded => "TRANSCODED",
            Self::Persisted => "PERSISTED",
            Self::AudioExtracted => "AUDIO_EXTRACTED",
            Self::Transcribed => "TRANSCRIBED",
            Self::Scored => "SCORED",
            Self::Saved => "SAVED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for VideoAnalysisState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_reaches_saved_in_six_steps() {
        let mut state = VideoAnalysisState::Uploaded;
        let mut steps = 0;
        while let Some(next) = state.next() {
            assert!(next > state);
            state = next;
            steps += 1;
        }
        assert_eq!(state, VideoAnalysisState::Saved);
        assert_eq!(steps, 6);
    }

    #[test]
    fn test_serialized_names() {
        let json = serde_json::to_string(&VideoAnalysisState::AudioExtracted).unwrap();
        assert_eq!(json, "\"AUDIO_EXTRACTED\"");
        assert!(VideoAnalysisState::Failed.is_terminal());
        assert!(!VideoAnalysisState::Scored.is_terminal());
    }
}

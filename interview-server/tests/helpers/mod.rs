//! Shared fixtures: scripted analysis gateway, fake media toolkit, seeded state

#![allow(dead_code)]

use async_trait::async_trait;
use interview_common::config::PipelineConfig;
use interview_common::events::EventBus;
use interview_server::db;
use interview_server::models::{CalibrationRecord, Interview, InterviewKind, Question};
use interview_server::services::analysis_gateway::{
    AnalysisGateway, AnswerScore, CalibrationValues, EmotionReport, GatewayError,
    InterviewStats, OverallNarrative, Transcript, VideoSummary, VisionReport,
};
use interview_server::services::media_transcoder::{MediaError, MediaToolkit};
use interview_server::services::ArtifactStore;
use interview_server::{AppState, PipelineDeps};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::{TempDir, TempPath};
use uuid::Uuid;

/// Gateway returning canned responses and recording every call
pub struct ScriptedGateway {
    pub emotion: Value,
    pub vision: Value,
    pub score: Value,
    pub overall: Value,
    pub questions: Vec<String>,
    pub calibration: CalibrationValues,
    /// Per-call responses consumed in order before falling back to the
    /// fixed values above
    pub emotion_queue: Mutex<VecDeque<Value>>,
    pub vision_queue: Mutex<VecDeque<Value>>,
    pub score_queue: Mutex<VecDeque<Value>>,
    /// Call name that should fail ("vision", "transcribe", ...)
    pub fail_on: Option<&'static str>,
    pub calls: Mutex<Vec<String>>,
    pub aggregated: Mutex<Vec<Vec<VideoSummary>>>,
    pub compared: Mutex<Vec<(InterviewStats, InterviewStats)>>,
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self {
            emotion: json!({"average_score": 0.7, "dominant": "neutral"}),
            vision: json!({"average_score": 0.5, "gaze_off_ratio": 0.1}),
            score: json!({"score": 80, "feedback": "structured answer"}),
            overall: json!("calm delivery, clear structure"),
            questions: vec![
                "Walk us through the payments migration on your résumé.".to_string(),
                "Why did you choose Rust for the ingestion service?".to_string(),
            ],
            calibration: CalibrationValues {
                gaze_yaw: 1.5,
                gaze_pitch: -2.0,
                head_yaw: 0.25,
                head_pitch: 3.0,
            },
            emotion_queue: Mutex::new(VecDeque::new()),
            vision_queue: Mutex::new(VecDeque::new()),
            score_queue: Mutex::new(VecDeque::new()),
            fail_on: None,
            calls: Mutex::new(Vec::new()),
            aggregated: Mutex::new(Vec::new()),
            compared: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedGateway {
    pub fn failing_on(call: &'static str) -> Self {
        Self {
            fail_on: Some(call),
            ..Default::default()
        }
    }

    /// Different emotion, vision and score responses for successive videos
    pub fn with_responses(emotions: Vec<Value>, visions: Vec<Value>, scores: Vec<Value>) -> Self {
        Self {
            emotion_queue: Mutex::new(emotions.into()),
            vision_queue: Mutex::new(visions.into()),
            score_queue: Mutex::new(scores.into()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == name).count()
    }

    fn record(&self, name: &str) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(name.to_string());
        if self.fail_on == Some(name) {
            return Err(GatewayError::Status {
                endpoint: format!("scripted/{}", name),
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

fn next_or(queue: &Mutex<VecDeque<Value>>, fallback: &Value) -> Value {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| fallback.clone())
}

#[async_trait]
impl AnalysisGateway for ScriptedGateway {
    async fn transcribe(&self, _audio: &Path) -> Result<Transcript, GatewayError> {
        self.record("transcribe")?;
        Ok(Transcript {
            text: "I led the migration and measured every step.".to_string(),
            timeline: json!([{"start": 0.0, "end": 2.5, "text": "I led the migration"}]),
        })
    }

    async fn analyze_emotion(&self, _video: &Path) -> Result<EmotionReport, GatewayError> {
        self.record("emotion")?;
        Ok(EmotionReport::from_value(next_or(&self.emotion_queue, &self.emotion)))
    }

    async fn analyze_vision(
        &self,
        _video: &Path,
        _calibration: &CalibrationRecord,
    ) -> Result<VisionReport, GatewayError> {
        self.record("vision")?;
        Ok(VisionReport::from_value(next_or(&self.vision_queue, &self.vision)))
    }

    async fn score_answer(
        &self,
        _question: &str,
        _answer: &str,
        _timeline: &str,
    ) -> Result<AnswerScore, GatewayError> {
        self.record("score")?;
        AnswerScore::from_value(next_or(&self.score_queue, &self.score)).map_err(|reason| {
            GatewayError::Parse {
                endpoint: "scripted/score".to_string(),
                reason,
            }
        })
    }

    async fn aggregate_overall(
        &self,
        _timeline: &str,
        _emotion: &str,
        _vision: &str,
    ) -> Result<OverallNarrative, GatewayError> {
        self.record("overall")?;
        Ok(OverallNarrative {
            overall: self.overall.clone(),
        })
    }

    async fn aggregate_across_videos(
        &self,
        summaries: &[VideoSummary],
        _interview_id: i64,
    ) -> Result<String, GatewayError> {
        self.record("overoverall")?;
        self.aggregated.lock().unwrap().push(summaries.to_vec());
        Ok(format!("{} answers reviewed", summaries.len()))
    }

    async fn compare_interviews(
        &self,
        previous: &InterviewStats,
        current: &InterviewStats,
    ) -> Result<String, GatewayError> {
        self.record("compare")?;
        self.compared.lock().unwrap().push((*previous, *current));
        Ok("improved eye contact".to_string())
    }

    async fn calibrate(&self, _video: &Path) -> Result<CalibrationValues, GatewayError> {
        self.record("calibrate")?;
        Ok(self.calibration)
    }

    async fn generate_questions(&self, _resume_text: &str) -> Result<Vec<String>, GatewayError> {
        self.record("generate_questions")?;
        Ok(self.questions.clone())
    }
}

/// Media toolkit that copies bytes instead of invoking ffmpeg
///
/// Uploads whose content starts with `corrupt` fail to transcode.
pub struct FakeMedia {
    scratch_dir: PathBuf,
    audio_dir: PathBuf,
    pub frames: u64,
    pub transcoded: Mutex<Vec<PathBuf>>,
}

impl FakeMedia {
    pub fn new(scratch_dir: PathBuf, audio_dir: PathBuf) -> Self {
        Self {
            scratch_dir,
            audio_dir,
            frames: 90,
            transcoded: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MediaToolkit for FakeMedia {
    async fn transcode(&self, source: TempPath) -> Result<PathBuf, MediaError> {
        let bytes = tokio::fs::read(&source).await?;
        let display = source.display().to_string();
        source.close()?;

        if bytes.starts_with(b"corrupt") {
            return Err(MediaError::NoFrames(display));
        }

        let output = self.scratch_dir.join(format!("converted_{}.mp4", Uuid::new_v4()));
        tokio::fs::write(&output, &bytes).await?;
        self.transcoded.lock().unwrap().push(output.clone());
        Ok(output)
    }

    async fn extract_thumbnail(&self, video: &Path) -> Result<PathBuf, MediaError> {
        let thumbnail = video.with_extension("png");
        tokio::fs::write(&thumbnail, b"png").await?;
        Ok(thumbnail)
    }

    async fn count_frames(&self, _video: &Path) -> Result<u64, MediaError> {
        Ok(self.frames)
    }

    async fn extract_audio_track(&self, _video: &Path) -> Result<PathBuf, MediaError> {
        let audio = self.audio_dir.join(format!("{}.mp3", Uuid::new_v4()));
        tokio::fs::write(&audio, b"mp3").await?;
        Ok(audio)
    }
}

/// Application state wired to fakes, plus the directories it uses
pub struct Harness {
    pub state: AppState,
    pub gateway: Arc<ScriptedGateway>,
    pub media: Arc<FakeMedia>,
    pub scratch_dir: PathBuf,
    pub storage_dir: PathBuf,
    _root: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_gateway(ScriptedGateway::default()).await
    }

    pub async fn with_gateway(gateway: ScriptedGateway) -> Self {
        let root = tempfile::tempdir().unwrap();
        let scratch_dir = root.path().join("scratch");
        let storage_dir = root.path().join("storage");
        std::fs::create_dir_all(&scratch_dir).unwrap();

        let pool = db::init_memory_pool().await.unwrap();
        let gateway = Arc::new(gateway);
        let media = Arc::new(FakeMedia::new(scratch_dir.clone(), storage_dir.clone()));
        let store = Arc::new(ArtifactStore::open(&storage_dir).unwrap());

        let state = AppState::new(
            pool,
            EventBus::new(100),
            PipelineDeps {
                media: media.clone(),
                gateway: gateway.clone(),
                store,
                scratch_dir: scratch_dir.clone(),
                pipeline: PipelineConfig::default(),
            },
        );

        Self {
            state,
            gateway,
            media,
            scratch_dir,
            storage_dir,
            _root: root,
        }
    }

    pub async fn user(&self, user_id: &str) {
        db::users::create_user(&self.state.db, user_id, "Candidate", "c@example.com", "secret")
            .await
            .unwrap();
    }

    pub async fn interview(&self, owner_id: &str) -> Interview {
        db::interviews::create_interview(&self.state.db, owner_id, None, InterviewKind::Practice)
            .await
            .unwrap()
    }

    pub async fn calibrate(&self, interview_id: i64) {
        db::calibrations::upsert_calibration(
            &self.state.db,
            &CalibrationRecord {
                interview_id,
                gaze_yaw: 0.0,
                gaze_pitch: 0.0,
                head_yaw: 0.0,
                head_pitch: 0.0,
            },
        )
        .await
        .unwrap();
    }

    pub async fn common_questions(&self, user_id: &str) -> Vec<Question> {
        db::questions::list_visible_to(&self.state.db, user_id)
            .await
            .unwrap()
    }

    /// A scratch file as the upload handler would produce it
    pub fn upload(&self, bytes: &[u8]) -> TempPath {
        let path = self.scratch_dir.join(format!("upload_{}.webm", Uuid::new_v4()));
        std::fs::write(&path, bytes).unwrap();
        TempPath::from_path(path)
    }

    /// Entries left in scratch space
    pub fn scratch_entries(&self) -> usize {
        std::fs::read_dir(&self.scratch_dir).unwrap().count()
    }
}

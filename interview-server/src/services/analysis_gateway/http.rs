//! HTTP implementation of the analysis gateway

use super::{
    AnalysisGateway, AnswerScore, CalibrationValues, EmotionReport, GatewayError, InterviewStats,
    OverallNarrative, Transcript, VideoSummary, VisionReport,
};
use crate::models::CalibrationRecord;
use async_trait::async_trait;
use interview_common::config::GatewayConfig;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio_util::io::ReaderStream;

const USER_AGENT: &str = concat!("mock-interview/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct OverallResponse {
    overall: Value,
}

#[derive(Debug, Deserialize)]
struct CompareResponse {
    overall_compare: Value,
}

#[derive(Debug, Deserialize)]
struct QuestionsResponse {
    questions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    timeline: Value,
}

/// Gateway talking to the analysis services over HTTP
pub struct HttpAnalysisGateway {
    http_client: reqwest::Client,
    stt_url: String,
    emotion_url: String,
    vision_url: String,
    llm_url: String,
}

impl HttpAnalysisGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(
                config.connect_timeout_secs + config.read_timeout_secs,
            ))
            .build()
            .map_err(|e| GatewayError::Network {
                endpoint: "client".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            http_client,
            stt_url: trim_base(&config.stt_url),
            emotion_url: trim_base(&config.emotion_url),
            vision_url: trim_base(&config.vision_url),
            llm_url: trim_base(&config.llm_url),
        })
    }

    async fn post_json(&self, url: String, body: &Value) -> Result<Value, GatewayError> {
        let request = self.http_client.post(&url).json(body);
        self.send(url, request).await
    }

    async fn send(
        &self,
        endpoint: String,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, GatewayError> {
        let started = Instant::now();
        tracing::debug!(endpoint = %endpoint, "Calling analysis service");

        let response = request.send().await.map_err(|e| transport_error(&endpoint, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&endpoint, e))?;

        tracing::debug!(
            endpoint = %endpoint,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis service responded"
        );

        if !status.is_success() {
            return Err(GatewayError::Status {
                endpoint,
                status: status.as_u16(),
                body: truncate(&body, 500),
            });
        }

        serde_json::from_str(&body).map_err(|e| GatewayError::Parse {
            endpoint,
            reason: e.to_string(),
        })
    }

    /// Multipart file part streamed from disk
    async fn video_part(path: &Path) -> Result<Part, GatewayError> {
        let read_error = |source| GatewayError::Read {
            path: path.display().to_string(),
            source,
        };
        let file = tokio::fs::File::open(path).await.map_err(read_error)?;
        let length = file.metadata().await.map_err(read_error)?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video.mp4".to_string());

        Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), length)
            .file_name(file_name)
            .mime_str("video/mp4")
            .map_err(|e| GatewayError::Network {
                endpoint: "multipart".to_string(),
                reason: e.to_string(),
            })
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn transport_error(endpoint: &str, err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout {
            endpoint: endpoint.to_string(),
        }
    } else {
        GatewayError::Network {
            endpoint: endpoint.to_string(),
            reason: err.to_string(),
        }
    }
}

fn decode<T: for<'de> Deserialize<'de>>(endpoint: &str, value: Value) -> Result<T, GatewayError> {
    serde_json::from_value(value).map_err(|e| GatewayError::Parse {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

/// Narrative text from a JSON value: strings as-is, anything else as JSON text
fn narrative_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn truncate(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        body.to_string()
    } else {
        let cut: String = body.chars().take(max_chars).collect();
        format!("{}…", cut)
    }
}

#[async_trait]
impl AnalysisGateway for HttpAnalysisGateway {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript, GatewayError> {
        let url = format!("{}/stt", self.stt_url);
        let value = self
            .post_json(url.clone(), &json!({ "file_path": audio.display().to_string() }))
            .await?;
        let parsed: TranscribeResponse = decode(&url, value)?;
        Ok(Transcript {
            text: parsed.text,
            timeline: parsed.timeline,
        })
    }

    async fn analyze_emotion(&self, video: &Path) -> Result<EmotionReport, GatewayError> {
        let url = format!("{}/analyze_video", self.emotion_url);
        let value = self
            .post_json(url, &json!({ "video_path": video.display().to_string() }))
            .await?;
        Ok(EmotionReport::from_value(value))
    }

    async fn analyze_vision(
        &self,
        video: &Path,
        calibration: &CalibrationRecord,
    ) -> Result<VisionReport, GatewayError> {
        let url = format!("{}/analyze_video", self.vision_url);
        let form = Form::new()
            .part("video_file", Self::video_part(video).await?)
            .text("calib_gp", calibration.gaze_pitch.to_string())
            .text("calib_gy", calibration.gaze_yaw.to_string())
            .text("calib_hp", calibration.head_pitch.to_string())
            .text("calib_hy", calibration.head_yaw.to_string());

        let request = self.http_client.post(&url).multipart(form);
        let value = self.send(url, request).await?;
        Ok(VisionReport::from_value(value))
    }

    async fn score_answer(
        &self,
        question: &str,
        answer: &str,
        timeline: &str,
    ) -> Result<AnswerScore, GatewayError> {
        let url = format!("{}/interview_analyze", self.llm_url);
        let value = self
            .post_json(
                url.clone(),
                &json!({ "question": question, "answer": answer, "timeline": timeline }),
            )
            .await?;
        AnswerScore::from_value(value).map_err(|reason| GatewayError::Parse {
            endpoint: url,
            reason,
        })
    }

    async fn aggregate_overall(
        &self,
        timeline: &str,
        emotion: &str,
        vision: &str,
    ) -> Result<OverallNarrative, GatewayError> {
        let url = format!("{}/overall", self.llm_url);
        let value = self
            .post_json(
                url.clone(),
                &json!({ "timeline": timeline, "emotion": emotion, "vision": vision }),
            )
            .await?;
        let parsed: OverallResponse = decode(&url, value)?;
        Ok(OverallNarrative {
            overall: parsed.overall,
        })
    }

    async fn aggregate_across_videos(
        &self,
        summaries: &[VideoSummary],
        interview_id: i64,
    ) -> Result<String, GatewayError> {
        let url = format!("{}/overoverall", self.llm_url);
        tracing::info!(
            interview_id,
            videos = summaries.len(),
            "Requesting interview-level narrative"
        );
        let body = serde_json::to_value(summaries).map_err(|e| GatewayError::Parse {
            endpoint: url.clone(),
            reason: e.to_string(),
        })?;
        let value = self.post_json(url.clone(), &body).await?;
        let parsed: OverallResponse = decode(&url, value)?;
        Ok(narrative_text(parsed.overall))
    }

    async fn compare_interviews(
        &self,
        previous: &InterviewStats,
        current: &InterviewStats,
    ) -> Result<String, GatewayError> {
        let url = format!("{}/overall_compare", self.llm_url);
        let value = self
            .post_json(
                url.clone(),
                &json!({ "previous_interview": previous, "current_interview": current }),
            )
            .await?;
        let parsed: CompareResponse = decode(&url, value)?;
        Ok(narrative_text(parsed.overall_compare))
    }

    async fn calibrate(&self, video: &Path) -> Result<CalibrationValues, GatewayError> {
        let url = format!("{}/calibrate", self.vision_url);
        let form = Form::new().part("video_file", Self::video_part(video).await?);
        let request = self.http_client.post(&url).multipart(form);
        let value = self.send(url.clone(), request).await?;
        decode(&url, value)
    }

    async fn generate_questions(&self, resume_text: &str) -> Result<Vec<String>, GatewayError> {
        let url = format!("{}/generate-questions", self.llm_url);
        let value = self
            .post_json(url.clone(), &json!({ "resume_text": resume_text }))
            .await?;
        let parsed: QuestionsResponse = decode(&url, value)?;
        Ok(parsed.questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    #[test]
    fn test_narrative_text_forms() {
        assert_eq!(narrative_text(json!("good")), "good");
        assert_eq!(narrative_text(json!(null)), "");
        assert_eq!(narrative_text(json!({"a": 1})), "{\"a\":1}");
    }

    #[test]
    fn test_base_urls_lose_trailing_slash() {
        let config = GatewayConfig {
            llm_url: "http://llm:5000/".to_string(),
            ..Default::default()
        };
        let gateway = HttpAnalysisGateway::new(&config).unwrap();
        assert_eq!(gateway.llm_url, "http://llm:5000");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_gateway_error() {
        let config = GatewayConfig {
            emotion_url: "http://127.0.0.1:9".to_string(),
            connect_timeout_secs: 1,
            read_timeout_secs: 1,
            ..Default::default()
        };
        let gateway = HttpAnalysisGateway::new(&config).unwrap();

        let result = gateway.analyze_emotion(Path::new("/tmp/none.mp4")).await;
        assert!(matches!(
            result,
            Err(GatewayError::Network { .. }) | Err(GatewayError::Timeout { .. })
        ));
    }

    /// Stub vision service recording the uploaded `video_file` bytes
    async fn spawn_vision_stub() -> (String, Arc<StdMutex<Vec<u8>>>) {
        let received = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let app = axum::Router::new().route(
            "/calibrate",
            axum::routing::post(move |mut multipart: axum::extract::Multipart| {
                let sink = Arc::clone(&sink);
                async move {
                    while let Some(field) = multipart.next_field().await.unwrap() {
                        if field.name() == Some("video_file") {
                            let bytes = field.bytes().await.unwrap();
                            sink.lock().unwrap().extend_from_slice(&bytes);
                        }
                    }
                    axum::Json(json!({
                        "gaze_yaw": 1.0, "gaze_pitch": 2.0, "head_yaw": 3.0, "head_pitch": 4.0
                    }))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), received)
    }

    #[tokio::test]
    async fn test_calibration_streams_whole_video() {
        let (vision_url, received) = spawn_vision_stub().await;
        let gateway = HttpAnalysisGateway::new(&GatewayConfig {
            vision_url,
            ..Default::default()
        })
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("calibration.mp4");
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&video, &content).unwrap();

        let values = gateway.calibrate(&video).await.unwrap();
        assert_eq!(values.gaze_yaw, 1.0);
        assert_eq!(values.head_pitch, 4.0);
        assert_eq!(*received.lock().unwrap(), content);
    }

    #[tokio::test]
    async fn test_missing_video_is_read_error() {
        let gateway = HttpAnalysisGateway::new(&GatewayConfig::default()).unwrap();
        let result = gateway.calibrate(Path::new("/nonexistent/calibration.mp4")).await;
        assert!(matches!(result, Err(GatewayError::Read { .. })));
    }
}

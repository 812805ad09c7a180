//! Media toolkit: transcoding, thumbnails, frame counts, audio extraction
//!
//! Everything is delegated to the `ffmpeg` / `ffprobe` executables. The
//! `MediaToolkit` trait is the seam the orchestrator depends on so tests can
//! substitute a fake.

use async_trait::async_trait;
use interview_common::config::PipelineConfig;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tempfile::TempPath;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Video bitrate used when the source does not report one
pub const FALLBACK_VIDEO_BITRATE: u64 = 2_000_000;
/// Audio bitrate used when the source does not report one
pub const FALLBACK_AUDIO_BITRATE: u64 = 192_000;
/// Offset of the thumbnail frame
pub const THUMBNAIL_OFFSET_SECS: f64 = 1.0;

/// Media processing errors
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Cannot open input {path}: {reason}")]
    OpenFailed { path: String, reason: String },

    #[error("No decodable video frames in {0}")]
    NoFrames(String),

    #[error("Encoding failed: {0}")]
    EncodeFailed(String),

    #[error("No frame at {offset_secs}s in {path}")]
    NoThumbnailFrame { path: String, offset_secs: f64 },

    #[error("Unreadable container {path}: {reason}")]
    UnreadableContainer { path: String, reason: String },

    #[error("{tool} exited with status {code:?}")]
    ProcessExit { tool: String, code: Option<i32> },

    #[error("Failed to launch {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Media operations needed by the upload and analysis pipeline
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Re-encode an upload to MP4 (H.264 + AAC)
    ///
    /// Takes ownership of the source temp file and deletes it whether or not
    /// transcoding succeeds. Returns the path of the new MP4.
    async fn transcode(&self, source: TempPath) -> Result<PathBuf, MediaError>;

    /// Write a PNG of the frame at one second next to `video`
    async fn extract_thumbnail(&self, video: &Path) -> Result<PathBuf, MediaError>;

    /// Container-reported frame count
    async fn count_frames(&self, video: &Path) -> Result<u64, MediaError>;

    /// Extract the audio track to a new MP3 file
    async fn extract_audio_track(&self, video: &Path) -> Result<PathBuf, MediaError>;
}

/// Subset of ffprobe's `-show_format -show_streams` JSON
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    sample_rate: Option<String>,
    bit_rate: Option<String>,
    start_time: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

/// Stream facts the transcoder cares about
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaProbe {
    pub has_video: bool,
    pub has_audio: bool,
    pub frame_rate: Option<f64>,
    pub video_bitrate: Option<u64>,
    pub audio_bitrate: Option<u64>,
    pub sample_rate: Option<u32>,
    /// Start timestamp of the video stream; browser recordings often lack one
    pub video_start_time: Option<f64>,
    pub nb_frames: Option<u64>,
    pub duration_secs: Option<f64>,
}

impl MediaProbe {
    /// Parse ffprobe JSON output
    pub fn from_ffprobe_json(json: &str) -> Result<Self, serde_json::Error> {
        let output: FfprobeOutput = serde_json::from_str(json)?;
        let video = output
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"));
        let audio = output
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("audio"));

        let format_duration = output
            .format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .and_then(parse_number::<f64>);

        Ok(MediaProbe {
            has_video: video.is_some(),
            has_audio: audio.is_some(),
            frame_rate: video.and_then(|s| {
                s.avg_frame_rate
                    .as_deref()
                    .and_then(parse_frame_rate)
                    .or_else(|| s.r_frame_rate.as_deref().and_then(parse_frame_rate))
            }),
            video_bitrate: video.and_then(|s| s.bit_rate.as_deref().and_then(parse_number)),
            audio_bitrate: audio.and_then(|s| s.bit_rate.as_deref().and_then(parse_number)),
            sample_rate: audio.and_then(|s| s.sample_rate.as_deref().and_then(parse_number)),
            video_start_time: video.and_then(|s| s.start_time.as_deref().and_then(parse_number)),
            nb_frames: video.and_then(|s| s.nb_frames.as_deref().and_then(parse_number)),
            duration_secs: video
                .and_then(|s| s.duration.as_deref().and_then(parse_number::<f64>))
                .or(format_duration),
        })
    }

    /// Frame count as reported by the container
    ///
    /// Uses the stream's `nb_frames`, falling back to duration × frame rate
    /// for containers (WebM/Matroska) that do not record it.
    pub fn frame_count(&self) -> Option<u64> {
        match self.nb_frames {
            Some(n) if n > 0 => Some(n),
            _ => match (self.duration_secs, self.frame_rate) {
                (Some(duration), Some(fps)) if duration > 0.0 && fps > 0.0 => {
                    Some((duration * fps).round() as u64)
                }
                _ => self.nb_frames,
            },
        }
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse().ok()
}

/// Parse an ffprobe rational such as "30000/1001"
fn parse_frame_rate(raw: &str) -> Option<f64> {
    let (num, den) = raw.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 || num <= 0.0 {
        return None;
    }
    Some(num / den)
}

/// How output timestamps are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampMode {
    /// Regenerate presentation timestamps from the source
    Regenerate,
    /// Stamp frames with wall-clock time (source lacks usable timestamps)
    WallClock,
}

/// Encoder settings derived from the source probe
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    pub video_bitrate: u64,
    pub audio_bitrate: u64,
    pub frame_rate: Option<f64>,
    pub sample_rate: Option<u32>,
    pub include_audio: bool,
    pub timestamps: TimestampMode,
}

impl EncodeSettings {
    /// Preserve the source's rates; fall back to fixed bitrates when unknown
    pub fn from_probe(probe: &MediaProbe) -> Self {
        let timestamps = match probe.video_start_time {
            Some(start) if start >= 0.0 => TimestampMode::Regenerate,
            _ => TimestampMode::WallClock,
        };

        EncodeSettings {
            video_bitrate: probe
                .video_bitrate
                .filter(|b| *b > 0)
                .unwrap_or(FALLBACK_VIDEO_BITRATE),
            audio_bitrate: probe
                .audio_bitrate
                .filter(|b| *b > 0)
                .unwrap_or(FALLBACK_AUDIO_BITRATE),
            frame_rate: probe.frame_rate,
            sample_rate: probe.sample_rate.filter(|r| *r > 0),
            include_audio: probe.has_audio,
            timestamps,
        }
    }

    /// ffmpeg argument list for an H.264/AAC MP4 transcode
    pub fn ffmpeg_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into(), "-v".into(), "error".into()];

        match self.timestamps {
            TimestampMode::WallClock => {
                args.push("-use_wallclock_as_timestamps".into());
                args.push("1".into());
            }
            TimestampMode::Regenerate => {
                args.push("-fflags".into());
                args.push("+genpts".into());
            }
        }

        args.push("-i".into());
        args.push(input.as_os_str().to_owned());

        args.extend(
            ["-map", "0:v:0", "-c:v", "libx264", "-pix_fmt", "yuv420p", "-b:v"]
                .iter()
                .map(OsString::from),
        );
        args.push(self.video_bitrate.to_string().into());
        if let Some(fps) = self.frame_rate {
            args.push("-r".into());
            args.push(format!("{:.3}", fps).into());
        }

        if self.include_audio {
            args.extend(["-map", "0:a:0", "-c:a", "aac", "-b:a"].iter().map(OsString::from));
            args.push(self.audio_bitrate.to_string().into());
            if let Some(rate) = self.sample_rate {
                args.push("-ar".into());
                args.push(rate.to_string().into());
            }
        } else {
            args.push("-an".into());
        }

        args.extend(["-movflags", "+faststart", "-f", "mp4"].iter().map(OsString::from));
        args.push(output.as_os_str().to_owned());
        args
    }
}

/// `MediaToolkit` backed by the ffmpeg and ffprobe executables
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    /// Where transcoded MP4s are written before the artifact store takes them
    scratch_dir: PathBuf,
    /// Where extracted MP3s are written
    audio_dir: PathBuf,
}

impl FfmpegToolkit {
    pub fn new(config: &PipelineConfig, scratch_dir: PathBuf, audio_dir: PathBuf) -> Self {
        Self {
            ffmpeg: PathBuf::from(&config.ffmpeg_path),
            ffprobe: PathBuf::from(&config.ffprobe_path),
            scratch_dir,
            audio_dir,
        }
    }

    /// Run ffprobe on a file
    pub async fn probe(&self, path: &Path) -> Result<MediaProbe, MediaError> {
        let mut args: Vec<OsString> = [
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(path.as_os_str().to_owned());

        let output = run_tool(&self.ffprobe, &args).await?;
        if !output.status.success() {
            return Err(MediaError::UnreadableContainer {
                path: path.display().to_string(),
                reason: stderr_tail(&output),
            });
        }

        MediaProbe::from_ffprobe_json(&String::from_utf8_lossy(&output.stdout)).map_err(|e| {
            MediaError::UnreadableContainer {
                path: path.display().to_string(),
                reason: format!("invalid ffprobe output: {}", e),
            }
        })
    }

    async fn transcode_file(&self, source: &Path) -> Result<PathBuf, MediaError> {
        let probe = self.probe(source).await.map_err(|e| MediaError::OpenFailed {
            path: source.display().to_string(),
            reason: e.to_string(),
        })?;
        if !probe.has_video {
            return Err(MediaError::NoFrames(source.display().to_string()));
        }

        let settings = EncodeSettings::from_probe(&probe);
        let output_path = self
            .scratch_dir
            .join(format!("converted_{}.mp4", Uuid::new_v4()));

        debug!(
            source = %source.display(),
            video_bitrate = settings.video_bitrate,
            audio_bitrate = settings.audio_bitrate,
            timestamps = ?settings.timestamps,
            "Transcoding upload"
        );

        let output = run_tool(&self.ffmpeg, &settings.ffmpeg_args(source, &output_path)).await?;
        if !output.status.success() {
            remove_quietly(&output_path).await;
            return Err(MediaError::EncodeFailed(stderr_tail(&output)));
        }

        let frames = match self.probe(&output_path).await {
            Ok(converted) => converted.frame_count().unwrap_or(0),
            Err(_) => 0,
        };
        if frames == 0 {
            remove_quietly(&output_path).await;
            return Err(MediaError::NoFrames(source.display().to_string()));
        }

        info!(
            output = %output_path.display(),
            frames,
            "Transcoded upload to MP4"
        );
        Ok(output_path)
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn transcode(&self, source: TempPath) -> Result<PathBuf, MediaError> {
        let result = self.transcode_file(&source).await;
        discard_temp(source);
        result
    }

    async fn extract_thumbnail(&self, video: &Path) -> Result<PathBuf, MediaError> {
        let thumbnail = video.with_extension("png");
        let mut args: Vec<OsString> = vec![
            "-y".into(),
            "-v".into(),
            "error".into(),
            "-ss".into(),
            format!("{}", THUMBNAIL_OFFSET_SECS).into(),
            "-i".into(),
        ];
        args.push(video.as_os_str().to_owned());
        args.extend(["-frames:v", "1", "-f", "image2"].iter().map(OsString::from));
        args.push(thumbnail.as_os_str().to_owned());

        let output = run_tool(&self.ffmpeg, &args).await?;
        let written = tokio::fs::metadata(&thumbnail)
            .await
            .map(|m| m.len() > 0)
            .unwrap_or(false);

        if !output.status.success() || !written {
            remove_quietly(&thumbnail).await;
            return Err(MediaError::NoThumbnailFrame {
                path: video.display().to_string(),
                offset_secs: THUMBNAIL_OFFSET_SECS,
            });
        }

        Ok(thumbnail)
    }

    async fn count_frames(&self, video: &Path) -> Result<u64, MediaError> {
        let probe = self.probe(video).await?;
        probe
            .frame_count()
            .ok_or_else(|| MediaError::UnreadableContainer {
                path: video.display().to_string(),
                reason: "container reports no frame count".to_string(),
            })
    }

    async fn extract_audio_track(&self, video: &Path) -> Result<PathBuf, MediaError> {
        let audio_path = self.audio_dir.join(format!("{}.mp3", Uuid::new_v4()));
        let mut args: Vec<OsString> = vec!["-v".into(), "error".into(), "-i".into()];
        args.push(video.as_os_str().to_owned());
        args.extend(["-q:a", "0", "-map", "a", "-y"].iter().map(OsString::from));
        args.push(audio_path.as_os_str().to_owned());

        let output = run_tool(&self.ffmpeg, &args).await?;
        if !output.status.success() {
            warn!(
                video = %video.display(),
                stderr = %stderr_tail(&output),
                "Audio extraction failed"
            );
            remove_quietly(&audio_path).await;
            return Err(MediaError::ProcessExit {
                tool: "ffmpeg".to_string(),
                code: output.status.code(),
            });
        }

        Ok(audio_path)
    }
}

async fn run_tool(tool: &Path, args: &[OsString]) -> Result<Output, MediaError> {
    Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| MediaError::Launch {
            tool: tool.display().to_string(),
            source,
        })
}

fn stderr_tail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.lines().rev().take(5).collect();
    let tail = lines.into_iter().rev().collect::<Vec<_>>().join(" | ");
    if tail.is_empty() {
        format!("exit status {:?}", output.status.code())
    } else {
        tail
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove partial output");
        }
    }
}

/// Delete a scratch temp file, logging instead of failing
pub fn discard_temp(path: TempPath) {
    let shown = path.display().to_string();
    if let Err(e) = path.close() {
        warn!(path = %shown, error = %e, "Failed to delete temp file");
    }
}

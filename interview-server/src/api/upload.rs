//! Spooling multipart video uploads to scratch space

use crate::{ApiError, ApiResult};
use axum::extract::Multipart;
use std::path::Path;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

/// Multipart field names accepted for the video payload
const VIDEO_FIELDS: &[&str] = &["video", "video_file", "file"];

/// Write the first video field of a multipart body to a scratch temp file
///
/// Missing or zero-length payloads are rejected with 400. The returned
/// `TempPath` deletes the file when dropped.
pub async fn spool_video(multipart: &mut Multipart, scratch_dir: &Path) -> ApiResult<TempPath> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if !VIDEO_FIELDS.contains(&name.as_str()) {
            tracing::debug!(field = %name, "Ignoring multipart field");
            continue;
        }

        let extension = field
            .file_name()
            .and_then(|f| Path::new(f).extension())
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_else(|| ".webm".to_string());

        let temp = tempfile::Builder::new()
            .prefix("upload_")
            .suffix(&extension)
            .tempfile_in(scratch_dir)?
            .into_temp_path();

        let mut file = tokio::fs::File::create(&temp).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Upload interrupted: {}", e)))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        if written == 0 {
            return Err(ApiError::BadRequest("Uploaded video is empty".to_string()));
        }

        tracing::debug!(bytes = written, path = %temp.display(), "Spooled upload");
        return Ok(temp);
    }

    Err(ApiError::BadRequest(
        "Multipart body has no video field".to_string(),
    ))
}

//! Video persistence

use crate::models::Video;
use interview_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const VIDEO_COLUMNS: &str =
    "video_id, interview_id, question_id, stored_path, thumbnail_path, frame_count";

/// Placeholder row for a custom or résumé question (no recording yet)
pub async fn insert_placeholder(
    pool: &SqlitePool,
    interview_id: i64,
    question_id: i64,
) -> Result<Video> {
    let result = sqlx::query(
        "INSERT INTO videos (interview_id, question_id, frame_count) VALUES (?, ?, 0)",
    )
    .bind(interview_id)
    .bind(question_id)
    .execute(pool)
    .await?;

    Ok(Video {
        video_id: result.last_insert_rowid(),
        interview_id,
        question_id,
        stored_path: None,
        thumbnail_path: None,
        frame_count: 0,
    })
}

/// Record an uploaded video
///
/// Fills the oldest placeholder for the same interview and question if one
/// exists, otherwise inserts a new row.
pub async fn record_upload(
    pool: &SqlitePool,
    interview_id: i64,
    question_id: i64,
    stored_path: &str,
    thumbnail_path: &str,
    frame_count: i64,
) -> Result<Video> {
    // Claim and fill in one statement so concurrent uploads never share a row
    let filled: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE videos SET stored_path = ?, thumbnail_path = ?, frame_count = ?
        WHERE video_id = (
            SELECT video_id FROM videos
            WHERE interview_id = ? AND question_id = ? AND stored_path IS NULL
            ORDER BY video_id
            LIMIT 1
        )
        AND stored_path IS NULL
        RETURNING video_id
        "#,
    )
    .bind(stored_path)
    .bind(thumbnail_path)
    .bind(frame_count)
    .bind(interview_id)
    .bind(question_id)
    .fetch_optional(pool)
    .await?;

    let video_id = match filled {
        Some(video_id) => video_id,
        None => sqlx::query(
            r#"
            INSERT INTO videos (interview_id, question_id, stored_path, thumbnail_path, frame_count)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(interview_id)
        .bind(question_id)
        .bind(stored_path)
        .bind(thumbnail_path)
        .bind(frame_count)
        .execute(pool)
        .await?
        .last_insert_rowid(),
    };

    Ok(Video {
        video_id,
        interview_id,
        question_id,
        stored_path: Some(stored_path.to_string()),
        thumbnail_path: Some(thumbnail_path.to_string()),
        frame_count,
    })
}

/// Load video by id
pub async fn find_video(pool: &SqlitePool, video_id: i64) -> Result<Option<Video>> {
    let row = sqlx::query(&format!("SELECT {} FROM videos WHERE video_id = ?", VIDEO_COLUMNS))
        .bind(video_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| video_from_row(&r)))
}

/// Load video or fail with `NotFound`
pub async fn require_video(pool: &SqlitePool, video_id: i64) -> Result<Video> {
    find_video(pool, video_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Video {}", video_id)))
}

/// All videos of an interview in insertion order
pub async fn list_for_interview(pool: &SqlitePool, interview_id: i64) -> Result<Vec<Video>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM videos WHERE interview_id = ? ORDER BY video_id",
        VIDEO_COLUMNS
    ))
    .bind(interview_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(video_from_row).collect())
}

fn video_from_row(row: &SqliteRow) -> Video {
    Video {
        video_id: row.get("video_id"),
        interview_id: row.get("interview_id"),
        question_id: row.get("question_id"),
        stored_path: row.get("stored_path"),
        thumbnail_path: row.get("thumbnail_path"),
        frame_count: row.get("frame_count"),
    }
}

//! Analysis record persistence
//!
//! Records are insert-only: a video is analyzed at most once.

use super::format_timestamp;
use crate::models::AnalysisRecord;
use crate::utils::db_retry::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};
use chrono::Utc;
use interview_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Persist the analysis of one video
pub async fn insert_analysis(pool: &SqlitePool, record: &AnalysisRecord) -> Result<()> {
    let created_at = format_timestamp(Utc::now());

    retry_on_lock("analysis insert", DEFAULT_MAX_LOCK_WAIT_MS, || {
        let created_at = created_at.clone();
        async move {
            sqlx::query(
                r#"
                INSERT INTO analyses (video_id, vision, emotion, answer, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.video_id)
            .bind(&record.vision)
            .bind(&record.emotion)
            .bind(&record.answer)
            .bind(created_at)
            .execute(pool)
            .await?;
            Ok(())
        }
    })
    .await
}

/// Analysis of one video, if present
pub async fn find_for_video(pool: &SqlitePool, video_id: i64) -> Result<Option<AnalysisRecord>> {
    let row = sqlx::query("SELECT video_id, vision, emotion, answer FROM analyses WHERE video_id = ?")
        .bind(video_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| analysis_from_row(&r)))
}

/// Every analysis belonging to an interview, ordered by video id
pub async fn list_for_interview(
    pool: &SqlitePool,
    interview_id: i64,
) -> Result<Vec<AnalysisRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT a.video_id, a.vision, a.emotion, a.answer
        FROM analyses a
        JOIN videos v ON v.video_id = a.video_id
        WHERE v.interview_id = ?
        ORDER BY a.video_id
        "#,
    )
    .bind(interview_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(analysis_from_row).collect())
}

fn analysis_from_row(row: &SqliteRow) -> AnalysisRecord {
    AnalysisRecord {
        video_id: row.get("video_id"),
        vision: row.get("vision"),
        emotion: row.get("emotion"),
        answer: row.get("answer"),
    }
}

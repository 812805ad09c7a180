//! Database access for interview-server
//!
//! One SQLite file (`interview.db`) under the root folder. Repositories are
//! free functions over `&SqlitePool`.

pub mod analyses;
pub mod calibrations;
pub mod interviews;
pub mod questions;
pub mod users;
pub mod videos;

use chrono::{DateTime, SecondsFormat, Utc};
use interview_common::{Error, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

/// Shared catalog of COMMON questions seeded into an empty database
const COMMON_QUESTIONS: &[&str] = &[
    "Please introduce yourself in one minute.",
    "Why do you want to join our company?",
    "Tell us about a project you are most proud of and your role in it.",
    "Describe a conflict within a team and how you resolved it.",
    "What is your greatest strength and your biggest weakness?",
    "Tell us about a time you failed and what you learned from it.",
    "Where do you see yourself in five years?",
];

/// Initialize database connection pool
///
/// Creates the file if missing, then ensures tables and seed data exist.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;
    seed_common_questions(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema
///
/// Limited to a single connection: every SQLite `:memory:` connection is
/// its own database.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    init_tables(&pool).await?;
    seed_common_questions(&pool).await?;
    Ok(pool)
}

async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            user_id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            email TEXT NOT NULL,
            credential_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interviews (
            interview_id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            title TEXT,
            kind TEXT NOT NULL,
            summary TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questions (
            question_id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id TEXT REFERENCES users(user_id) ON DELETE CASCADE,
            kind TEXT NOT NULL,
            text TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS videos (
            video_id INTEGER PRIMARY KEY AUTOINCREMENT,
            interview_id INTEGER NOT NULL REFERENCES interviews(interview_id) ON DELETE CASCADE,
            question_id INTEGER NOT NULL REFERENCES questions(question_id) ON DELETE CASCADE,
            stored_path TEXT,
            thumbnail_path TEXT,
            frame_count INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analyses (
            video_id INTEGER PRIMARY KEY REFERENCES videos(video_id) ON DELETE CASCADE,
            vision TEXT NOT NULL,
            emotion TEXT NOT NULL,
            answer TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS calibrations (
            interview_id INTEGER PRIMARY KEY REFERENCES interviews(interview_id) ON DELETE CASCADE,
            gaze_yaw REAL NOT NULL,
            gaze_pitch REAL NOT NULL,
            head_yaw REAL NOT NULL,
            head_pitch REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_videos_interview ON videos(interview_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_interviews_owner ON interviews(owner_id, created_at)",
    )
    .execute(pool)
    .await?;

    tracing::info!(
        "Database tables initialized (users, interviews, questions, videos, analyses, calibrations)"
    );

    Ok(())
}

async fn seed_common_questions(pool: &SqlitePool) -> Result<()> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE kind = 'COMMON'")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(());
    }

    for text in COMMON_QUESTIONS {
        sqlx::query("INSERT INTO questions (owner_id, kind, text) VALUES (NULL, 'COMMON', ?)")
            .bind(text)
            .execute(pool)
            .await?;
    }

    tracing::info!(count = COMMON_QUESTIONS.len(), "Seeded common question catalog");
    Ok(())
}

/// Timestamp text with fixed precision so lexical order matches time order
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Corrupt timestamp '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_is_idempotent_and_seeds_once() {
        let pool = init_memory_pool().await.unwrap();
        init_tables(&pool).await.unwrap();
        seed_common_questions(&pool).await.unwrap();

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE kind = 'COMMON'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count as usize, COMMON_QUESTIONS.len());
    }

    #[test]
    fn test_timestamp_text_sorts_chronologically() {
        let earlier = DateTime::parse_from_rfc3339("2026-03-01T09:00:00.5Z")
            .unwrap()
            .with_timezone(&Utc);
        let later = DateTime::parse_from_rfc3339("2026-03-01T09:00:01Z")
            .unwrap()
            .with_timezone(&Utc);
        assert!(format_timestamp(earlier) < format_timestamp(later));
        assert_eq!(parse_timestamp(&format_timestamp(later)).unwrap(), later);
    }
}

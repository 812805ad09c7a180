//! Question persistence

use crate::models::{Question, QuestionKind};
use interview_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Insert a user-owned question (RESUME or CUSTOM)
pub async fn insert_question(
    pool: &SqlitePool,
    owner_id: Option<&str>,
    kind: QuestionKind,
    text: &str,
) -> Result<Question> {
    let result = sqlx::query("INSERT INTO questions (owner_id, kind, text) VALUES (?, ?, ?)")
        .bind(owner_id)
        .bind(kind.as_str())
        .bind(text)
        .execute(pool)
        .await?;

    Ok(Question {
        question_id: result.last_insert_rowid(),
        owner_id: owner_id.map(str::to_string),
        kind,
        text: text.to_string(),
    })
}

/// Load question by id
pub async fn find_question(pool: &SqlitePool, question_id: i64) -> Result<Option<Question>> {
    let row = sqlx::query("SELECT question_id, owner_id, kind, text FROM questions WHERE question_id = ?")
        .bind(question_id)
        .fetch_optional(pool)
        .await?;

    row.map(|r| question_from_row(&r)).transpose()
}

/// Load question or fail with `NotFound`
pub async fn require_question(pool: &SqlitePool, question_id: i64) -> Result<Question> {
    find_question(pool, question_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Question {}", question_id)))
}

/// COMMON catalog plus every question owned by `owner_id`
pub async fn list_visible_to(pool: &SqlitePool, owner_id: &str) -> Result<Vec<Question>> {
    let rows = sqlx::query(
        r#"
        SELECT question_id, owner_id, kind, text
        FROM questions
        WHERE kind = 'COMMON' OR owner_id = ?
        ORDER BY question_id
        "#,
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(question_from_row).collect()
}

/// Delete a question (videos referencing it cascade)
///
/// Returns false if no such question existed.
pub async fn delete_question(pool: &SqlitePool, question_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM questions WHERE question_id = ?")
        .bind(question_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn question_from_row(row: &SqliteRow) -> Result<Question> {
    let kind: String = row.get("kind");
    Ok(Question {
        question_id: row.get("question_id"),
        owner_id: row.get("owner_id"),
        kind: kind.parse().map_err(Error::Internal)?,
        text: row.get("text"),
    })
}

//! Interview persistence

use super::{format_timestamp, parse_timestamp};
use crate::models::{Interview, InterviewKind, InterviewSummary};
use crate::utils::db_retry::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};
use chrono::{DateTime, Utc};
use interview_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const INTERVIEW_COLUMNS: &str = "interview_id, owner_id, created_at, title, kind, summary";

/// Start a new interview for `owner_id`
pub async fn create_interview(
    pool: &SqlitePool,
    owner_id: &str,
    title: Option<&str>,
    kind: InterviewKind,
) -> Result<Interview> {
    create_interview_at(pool, owner_id, title, kind, Utc::now()).await
}

/// Start a new interview with an explicit creation time
pub async fn create_interview_at(
    pool: &SqlitePool,
    owner_id: &str,
    title: Option<&str>,
    kind: InterviewKind,
    created_at: DateTime<Utc>,
) -> Result<Interview> {
    let result = sqlx::query(
        r#"
        INSERT INTO interviews (owner_id, created_at, title, kind, summary)
        VALUES (?, ?, ?, ?, NULL)
        "#,
    )
    .bind(owner_id)
    .bind(format_timestamp(created_at))
    .bind(title)
    .bind(kind.as_str())
    .execute(pool)
    .await?;

    Ok(Interview {
        interview_id: result.last_insert_rowid(),
        owner_id: owner_id.to_string(),
        created_at,
        title: title.map(str::to_string),
        kind,
        summary: None,
    })
}

/// Load interview by id
pub async fn find_interview(pool: &SqlitePool, interview_id: i64) -> Result<Option<Interview>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM interviews WHERE interview_id = ?",
        INTERVIEW_COLUMNS
    ))
    .bind(interview_id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| interview_from_row(&r)).transpose()
}

/// Load interview or fail with `NotFound`
pub async fn require_interview(pool: &SqlitePool, interview_id: i64) -> Result<Interview> {
    find_interview(pool, interview_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Interview {}", interview_id)))
}

/// All interviews of a user, newest first
pub async fn list_for_owner(pool: &SqlitePool, owner_id: &str) -> Result<Vec<Interview>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM interviews WHERE owner_id = ? ORDER BY created_at DESC, interview_id DESC",
        INTERVIEW_COLUMNS
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(interview_from_row).collect()
}

/// Most recent other interview of the same owner
///
/// "Most recent" is by creation time, excluding `current_interview_id`
/// itself, so a comparison target may have been created after the current
/// interview.
pub async fn find_previous_interview(
    pool: &SqlitePool,
    owner_id: &str,
    current_interview_id: i64,
) -> Result<Option<Interview>> {
    let row = sqlx::query(&format!(
        r#"
        SELECT {} FROM interviews
        WHERE owner_id = ? AND interview_id != ?
        ORDER BY created_at DESC, interview_id DESC
        LIMIT 1
        "#,
        INTERVIEW_COLUMNS
    ))
    .bind(owner_id)
    .bind(current_interview_id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| interview_from_row(&r)).transpose()
}

/// Overwrite the stored summary of an interview
pub async fn update_summary(
    pool: &SqlitePool,
    interview_id: i64,
    summary: &InterviewSummary,
) -> Result<()> {
    let json = serde_json::to_string(summary)
        .map_err(|e| Error::Internal(format!("Failed to serialize summary: {}", e)))?;

    let rows = retry_on_lock("interview summary update", DEFAULT_MAX_LOCK_WAIT_MS, || {
        let json = json.clone();
        async move {
            let result = sqlx::query("UPDATE interviews SET summary = ? WHERE interview_id = ?")
                .bind(json)
                .bind(interview_id)
                .execute(pool)
                .await?;
            Ok(result.rows_affected())
        }
    })
    .await?;

    if rows == 0 {
        return Err(Error::NotFound(format!("Interview {}", interview_id)));
    }
    Ok(())
}

/// Rename an interview
pub async fn update_title(pool: &SqlitePool, interview_id: i64, title: &str) -> Result<()> {
    sqlx::query("UPDATE interviews SET title = ? WHERE interview_id = ?")
        .bind(title)
        .bind(interview_id)
        .execute(pool)
        .await?;
    Ok(())
}

fn interview_from_row(row: &SqliteRow) -> Result<Interview> {
    let created_at: String = row.get("created_at");
    let kind: String = row.get("kind");
    let summary: Option<String> = row.get("summary");

    let summary = match summary {
        Some(raw) => match serde_json::from_str::<InterviewSummary>(&raw) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable interview summary");
                None
            }
        },
        None => None,
    };

    Ok(Interview {
        interview_id: row.get("interview_id"),
        owner_id: row.get("owner_id"),
        created_at: parse_timestamp(&created_at)?,
        title: row.get("title"),
        kind: kind.parse().map_err(Error::Internal)?,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_memory_pool, users};
    use chrono::Duration;

    async fn pool_with_user(user_id: &str) -> SqlitePool {
        let pool = init_memory_pool().await.unwrap();
        users::create_user(&pool, user_id, "Test User", "t@example.com", "pw")
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_previous_interview_is_most_recent_other() {
        let pool = pool_with_user("bob").await;
        let base = Utc::now();

        let oldest = create_interview_at(&pool, "bob", None, InterviewKind::Practice, base)
            .await
            .unwrap();
        let current = create_interview_at(
            &pool,
            "bob",
            None,
            InterviewKind::Real,
            base + Duration::seconds(10),
        )
        .await
        .unwrap();

        let previous = find_previous_interview(&pool, "bob", current.interview_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(previous.interview_id, oldest.interview_id);

        let newer = create_interview_at(
            &pool,
            "bob",
            Some("retry"),
            InterviewKind::Practice,
            base + Duration::seconds(20),
        )
        .await
        .unwrap();
        let previous = find_previous_interview(&pool, "bob", current.interview_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(previous.interview_id, newer.interview_id);
    }

    #[tokio::test]
    async fn test_only_interview_has_no_previous() {
        let pool = pool_with_user("carol").await;
        let only = create_interview(&pool, "carol", None, InterviewKind::Real)
            .await
            .unwrap();

        let previous = find_previous_interview(&pool, "carol", only.interview_id)
            .await
            .unwrap();
        assert!(previous.is_none());
    }

    #[tokio::test]
    async fn test_summary_overwrite_round_trip() {
        let pool = pool_with_user("dave").await;
        let interview = create_interview(&pool, "dave", Some("mock"), InterviewKind::Practice)
            .await
            .unwrap();

        let first = InterviewSummary {
            overallcompare: "first".into(),
            comparison: Some("better".into()),
        };
        update_summary(&pool, interview.interview_id, &first).await.unwrap();

        let second = InterviewSummary {
            overallcompare: "second".into(),
            comparison: None,
        };
        update_summary(&pool, interview.interview_id, &second).await.unwrap();

        let stored = require_interview(&pool, interview.interview_id).await.unwrap();
        assert_eq!(stored.summary, Some(second));
        assert_eq!(stored.title.as_deref(), Some("mock"));
    }

    #[tokio::test]
    async fn test_require_missing_interview_is_not_found() {
        let pool = init_memory_pool().await.unwrap();
        let err = require_interview(&pool, 404).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}

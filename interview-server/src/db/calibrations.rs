//! Calibration persistence

use crate::models::CalibrationRecord;
use interview_common::Result;
use sqlx::{Row, SqlitePool};

/// Store the calibration of an interview, replacing any earlier one
pub async fn upsert_calibration(pool: &SqlitePool, record: &CalibrationRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO calibrations (interview_id, gaze_yaw, gaze_pitch, head_yaw, head_pitch)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(interview_id) DO UPDATE SET
            gaze_yaw = excluded.gaze_yaw,
            gaze_pitch = excluded.gaze_pitch,
            head_yaw = excluded.head_yaw,
            head_pitch = excluded.head_pitch
        "#,
    )
    .bind(record.interview_id)
    .bind(record.gaze_yaw)
    .bind(record.gaze_pitch)
    .bind(record.head_yaw)
    .bind(record.head_pitch)
    .execute(pool)
    .await?;

    Ok(())
}

/// Calibration of an interview, if it was ever calibrated
pub async fn find_for_interview(
    pool: &SqlitePool,
    interview_id: i64,
) -> Result<Option<CalibrationRecord>> {
    let row = sqlx::query(
        r#"
        SELECT interview_id, gaze_yaw, gaze_pitch, head_yaw, head_pitch
        FROM calibrations
        WHERE interview_id = ?
        "#,
    )
    .bind(interview_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| CalibrationRecord {
        interview_id: row.get("interview_id"),
        gaze_yaw: row.get("gaze_yaw"),
        gaze_pitch: row.get("gaze_pitch"),
        head_yaw: row.get("head_yaw"),
        head_pitch: row.get("head_pitch"),
    }))
}

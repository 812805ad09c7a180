//! User persistence

use super::{format_timestamp, parse_timestamp};
use crate::models::User;
use chrono::Utc;
use interview_common::{Error, Result};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};

/// Salted SHA-256 credential hash, stored as `<salt-hex>$<digest-hex>`
pub fn hash_credential(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt_hex = to_hex(&salt);
    format!("{}${}", salt_hex, digest(&salt_hex, password))
}

/// Check a password against a stored `hash_credential` value
pub fn verify_credential(stored: &str, password: &str) -> bool {
    match stored.split_once('$') {
        Some((salt_hex, expected)) => digest(salt_hex, password) == expected,
        None => false,
    }
}

fn digest(salt_hex: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(password.as_bytes());
    to_hex(&hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Create a user; fails with `InvalidInput` if the id is taken
pub async fn create_user(
    pool: &SqlitePool,
    user_id: &str,
    display_name: &str,
    email: &str,
    password: &str,
) -> Result<User> {
    if find_user(pool, user_id).await?.is_some() {
        return Err(Error::InvalidInput(format!("User id already taken: {}", user_id)));
    }

    let user = User {
        user_id: user_id.to_string(),
        display_name: display_name.to_string(),
        email: email.to_string(),
        credential_hash: hash_credential(password),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO users (user_id, display_name, email, credential_hash, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.user_id)
    .bind(&user.display_name)
    .bind(&user.email)
    .bind(&user.credential_hash)
    .bind(format_timestamp(user.created_at))
    .execute(pool)
    .await?;

    tracing::info!(user_id = %user.user_id, "Created user");
    Ok(user)
}

/// Load user by id
pub async fn find_user(pool: &SqlitePool, user_id: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT user_id, display_name, email, credential_hash, created_at
        FROM users
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let created_at: String = row.get("created_at");
            Ok(Some(User {
                user_id: row.get("user_id"),
                display_name: row.get("display_name"),
                email: row.get("email"),
                credential_hash: row.get("credential_hash"),
                created_at: parse_timestamp(&created_at)?,
            }))
        }
        None => Ok(None),
    }
}

//! User accounts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered user
///
/// The credential hash is never serialized into API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub credential_hash: String,
    pub created_at: DateTime<Utc>,
}

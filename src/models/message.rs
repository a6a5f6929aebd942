use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A message row as stored: `content` is sealed ciphertext (or legacy
/// plaintext for rows written before encryption was introduced).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub room_id: String,
    pub sender_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Network activity of a user: one row per (owner, peer) or per
/// (owner, transport, address) for plain HTTP presence.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Connection {
    pub id: i64,
    pub owner_id: i64,
    pub peer_id: Option<i64>,
    pub transport: String,
    pub address: String,
    pub last_seen: DateTime<Utc>,
}

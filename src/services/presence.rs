use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::db::Database;
use crate::error::AppError;
use crate::models::Connection;

/// A user with their last observed activity, for the presence board.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PresenceEntry {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
    pub last_seen: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    pub online: bool,
}

/// Record that `user_id` was just seen over `transport` from `address`.
/// One row per (owner, transport, address) tuple, refreshed in place.
pub async fn touch_connection(
    db: &Database,
    user_id: i64,
    transport: &str,
    address: &str,
) -> Result<(), AppError> {
    let updated = sqlx::query(
        r#"
        UPDATE connections SET last_seen = now()
        WHERE owner_id = $1 AND peer_id IS NULL AND transport = $2 AND address = $3
        "#,
    )
    .bind(user_id)
    .bind(transport)
    .bind(address)
    .execute(&db.pg)
    .await?;

    if updated.rows_affected() == 0 {
        sqlx::query(
            r#"
            INSERT INTO connections (owner_id, peer_id, transport, address)
            VALUES ($1, NULL, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(transport)
        .bind(address)
        .execute(&db.pg)
        .await?;
    }

    Ok(())
}

/// Client-reported link to a peer. `last_seen_ms`, when given, overrides
/// the server clock so batched reports keep their original timestamps.
pub async fn upsert_connection(
    db: &Database,
    owner_id: i64,
    peer_id: Option<i64>,
    transport: &str,
    address: &str,
    last_seen_ms: Option<i64>,
) -> Result<(), AppError> {
    let last_seen = last_seen_ms
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_else(Utc::now);

    let updated = sqlx::query(
        r#"
        UPDATE connections
        SET transport = $3, address = $4, last_seen = $5
        WHERE owner_id = $1 AND peer_id IS NOT DISTINCT FROM $2
        "#,
    )
    .bind(owner_id)
    .bind(peer_id)
    .bind(transport)
    .bind(address)
    .bind(last_seen)
    .execute(&db.pg)
    .await?;

    if updated.rows_affected() == 0 {
        sqlx::query(
            r#"
            INSERT INTO connections (owner_id, peer_id, transport, address, last_seen)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(owner_id)
        .bind(peer_id)
        .bind(transport)
        .bind(address)
        .bind(last_seen)
        .execute(&db.pg)
        .await?;
    }

    Ok(())
}

/// Connections active within the last `minutes`, newest first.
pub async fn list_connections(db: &Database, minutes: i64) -> Result<Vec<Connection>, AppError> {
    let cutoff = Utc::now() - Duration::minutes(minutes);
    let rows = sqlx::query_as::<_, Connection>(
        r#"
        SELECT id, owner_id, peer_id, transport, address, last_seen
        FROM connections
        WHERE last_seen >= $1
        ORDER BY last_seen DESC
        "#,
    )
    .bind(cutoff)
    .fetch_all(&db.pg)
    .await?;

    Ok(rows)
}

/// All users with their most recent activity; `online` means seen within
/// the last `minutes`.
pub async fn presence(db: &Database, minutes: i64) -> Result<Vec<PresenceEntry>, AppError> {
    let cutoff = Utc::now() - Duration::minutes(minutes);
    let mut entries = sqlx::query_as::<_, PresenceEntry>(
        r#"
        SELECT u.id, u.username, u.is_admin, MAX(c.last_seen) AS last_seen
        FROM users u
        LEFT JOIN connections c ON c.owner_id = u.id
        GROUP BY u.id, u.username, u.is_admin
        ORDER BY u.username
        "#,
    )
    .fetch_all(&db.pg)
    .await?;

    for entry in &mut entries {
        entry.online = entry.last_seen.is_some_and(|seen| seen >= cutoff);
    }

    Ok(entries)
}

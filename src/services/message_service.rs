use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::db::Database;
use crate::error::AppError;
use crate::rooms::{peer_id_for_sender, Room, NO_PEER};
use crate::services::encryption::EncryptionService;
use crate::services::room_access::ensure_room_access;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

/// A message as returned to clients: decrypted body, resolved sender name,
/// and the DM recipient (or [`NO_PEER`] for channels).
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: i64,
    pub room_id: String,
    pub sender: String,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct MessageRow {
    id: i64,
    room_id: String,
    sender_id: i64,
    content: String,
    created_at: DateTime<Utc>,
    sender_name: Option<String>,
}

pub struct MessageService;

impl MessageService {
    /// Store a message in a room the sender may write to. The body is
    /// sealed before it touches the database.
    pub async fn post_message(
        db: &Database,
        encryption: &EncryptionService,
        room_id: &str,
        sender_id: i64,
        sender_name: &str,
        content: &str,
    ) -> Result<MessageView, AppError> {
        ensure_room_access(room_id, sender_id, sender_name)?;

        let sealed = encryption.seal(content)?;
        let (id, created_at): (i64, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO messages (room_id, sender_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, created_at
            "#,
        )
        .bind(room_id)
        .bind(sender_id)
        .bind(&sealed)
        .fetch_one(&db.pg)
        .await?;

        Ok(MessageView {
            id,
            room_id: room_id.to_string(),
            sender: sender_name.to_string(),
            sender_id,
            recipient_id: recipient_for(room_id, sender_id),
            content: content.to_string(),
            created_at,
        })
    }

    /// List a room's messages in chronological order, optionally only
    /// those strictly newer than `since_ms` (unix milliseconds).
    pub async fn list_messages(
        db: &Database,
        encryption: &EncryptionService,
        room_id: &str,
        user_id: i64,
        username: &str,
        since_ms: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<MessageView>, AppError> {
        ensure_room_access(room_id, user_id, username)?;

        let since = since_ms.and_then(DateTime::<Utc>::from_timestamp_millis);
        let limit = clamp_limit(limit);

        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT m.id, m.room_id, m.sender_id, m.content, m.created_at,
                   u.username AS sender_name
            FROM messages m
            LEFT JOIN users u ON u.id = m.sender_id
            WHERE m.room_id = $1
              AND ($2::timestamptz IS NULL OR m.created_at > $2)
            ORDER BY m.created_at ASC
            LIMIT $3
            "#,
        )
        .bind(room_id)
        .bind(since)
        .bind(limit)
        .fetch_all(&db.pg)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| MessageView {
                sender: row
                    .sender_name
                    .unwrap_or_else(|| format!("user:{}", row.sender_id)),
                recipient_id: recipient_for(&row.room_id, row.sender_id),
                content: encryption.open_tolerant(&row.content),
                id: row.id,
                room_id: row.room_id,
                sender_id: row.sender_id,
                created_at: row.created_at,
            })
            .collect())
    }

    /// Every room the user has touched: rooms whose id names them (either
    /// DM scheme) plus rooms they have posted in.
    pub async fn rooms_for_user(
        db: &Database,
        user_id: i64,
        username: &str,
    ) -> Result<Vec<String>, AppError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT room_id FROM messages
            WHERE room_id LIKE $1
               OR room_id LIKE $2
               OR room_id LIKE $3
               OR room_id LIKE $4
               OR sender_id = $5
            ORDER BY room_id
            "#,
        )
        .bind(format!("dmid:{user_id}:%"))
        .bind(format!("dmid:%:{user_id}"))
        .bind(format!("dm:{username}:%"))
        .bind(format!("dm:%:{username}"))
        .bind(user_id)
        .fetch_all(&db.pg)
        .await?;

        Ok(rows.into_iter().map(|(room_id,)| room_id).collect())
    }
}

/// The recipient column for a message: the DM peer when the room is an
/// id-keyed DM and the sender is one of its endpoints, otherwise the
/// no-peer sentinel. Access is checked before we get here, so a failed
/// peer lookup only happens for legacy and channel rooms.
fn recipient_for(room_id: &str, sender_id: i64) -> i64 {
    if Room::parse(room_id)
        .map(|room| matches!(room, Room::DirectById { .. }))
        .unwrap_or(false)
    {
        peer_id_for_sender(room_id, sender_id).unwrap_or(NO_PEER)
    } else {
        NO_PEER
    }
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_is_the_dm_peer() {
        assert_eq!(recipient_for("dmid:3:7", 3), 7);
        assert_eq!(recipient_for("dmid:3:7", 7), 3);
    }

    #[test]
    fn recipient_falls_back_to_sentinel() {
        assert_eq!(recipient_for("local", 3), NO_PEER);
        assert_eq!(recipient_for("dm:alice:bob", 3), NO_PEER);
        // Row written by someone who is no longer an endpoint (id reuse,
        // manual edits): sentinel rather than an error on the read path.
        assert_eq!(recipient_for("dmid:3:7", 9), NO_PEER);
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(clamp_limit(None), 100);
        assert_eq!(clamp_limit(Some(50)), 50);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(-3)), 1);
        assert_eq!(clamp_limit(Some(10_000)), 500);
    }
}

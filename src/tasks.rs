use std::time::Duration;

use crate::db::Database;

const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Hourly purge of messages older than `ttl_minutes`. A TTL of zero (or
/// less) disables retention and spawns nothing.
pub fn spawn_message_purge(db: Database, ttl_minutes: i64) {
    if ttl_minutes <= 0 {
        tracing::info!("message retention disabled, purge task not started");
        return;
    }

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            match sqlx::query(
                "DELETE FROM messages WHERE created_at <= now() - ($1 * interval '1 minute')",
            )
            .bind(ttl_minutes)
            .execute(&db.pg)
            .await
            {
                Ok(result) if result.rows_affected() > 0 => {
                    tracing::info!(deleted = result.rows_affected(), "purged expired messages");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "message purge failed");
                }
            }
        }
    });
}

//! `messages` table queries

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageRow {
    pub id: i64,
    pub sender: String,
    pub recipient: String,
    pub body: String,
    pub timestamp: String,
    pub pending: bool,
}

/// Insert a message and return its assigned id.
pub async fn insert_message(
    pool: &SqlitePool,
    sender: &str,
    recipient: &str,
    body: &str,
    timestamp: &str,
    pending: bool,
) -> Result<i64, SqliteError> {
    let result = sqlx::query(
        "INSERT INTO messages (sender, recipient, body, timestamp, pending) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(sender)
    .bind(recipient)
    .bind(body)
    .bind(timestamp)
    .bind(pending)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Pending messages for a recipient, oldest first, capped at `limit`.
pub async fn list_pending_for_recipient(
    pool: &SqlitePool,
    recipient: &str,
    limit: i64,
) -> Result<Vec<MessageRow>, SqliteError> {
    let rows = sqlx::query_as::<_, MessageRow>(
        "SELECT id, sender, recipient, body, timestamp, pending FROM messages \
         WHERE recipient = ? AND pending = 1 ORDER BY timestamp ASC LIMIT ?",
    )
    .bind(recipient)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn mark_delivered(pool: &SqlitePool, id: i64) -> Result<(), SqliteError> {
    sqlx::query("UPDATE messages SET pending = 0 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delivered messages involving this user as either sender or recipient, oldest first.
pub async fn list_history_for_user(
    pool: &SqlitePool,
    username: &str,
) -> Result<Vec<MessageRow>, SqliteError> {
    let rows = sqlx::query_as::<_, MessageRow>(
        "SELECT id, sender, recipient, body, timestamp, pending FROM messages \
         WHERE pending = 0 AND (sender = ? OR recipient = ?) ORDER BY timestamp ASC",
    )
    .bind(username)
    .bind(username)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::migrations::run_migrations;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn fresh_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn pending_messages_are_ordered_by_timestamp() {
        let pool = fresh_pool().await;
        insert_message(&pool, "alice", "bob", "second", "2026-01-01T00:00:02Z", true)
            .await
            .unwrap();
        insert_message(&pool, "alice", "bob", "first", "2026-01-01T00:00:01Z", true)
            .await
            .unwrap();

        let pending = list_pending_for_recipient(&pool, "bob", 10).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].body, "first");
        assert_eq!(pending[1].body, "second");
    }

    #[tokio::test]
    async fn mark_delivered_removes_from_pending_and_adds_to_history() {
        let pool = fresh_pool().await;
        let id = insert_message(&pool, "alice", "bob", "hi", "2026-01-01T00:00:00Z", true)
            .await
            .unwrap();

        mark_delivered(&pool, id).await.unwrap();

        let pending = list_pending_for_recipient(&pool, "bob", 10).await.unwrap();
        assert!(pending.is_empty());

        let history = list_history_for_user(&pool, "bob").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].body, "hi");
    }

    #[tokio::test]
    async fn history_includes_both_sender_and_recipient_role() {
        let pool = fresh_pool().await;
        let id = insert_message(&pool, "alice", "bob", "hi", "2026-01-01T00:00:00Z", true)
            .await
            .unwrap();
        mark_delivered(&pool, id).await.unwrap();

        let alice_history = list_history_for_user(&pool, "alice").await.unwrap();
        let bob_history = list_history_for_user(&pool, "bob").await.unwrap();
        assert_eq!(alice_history.len(), 1);
        assert_eq!(bob_history.len(), 1);
    }

    #[tokio::test]
    async fn pending_limit_is_respected() {
        let pool = fresh_pool().await;
        for i in 0..5 {
            insert_message(
                &pool,
                "alice",
                "bob",
                "m",
                &format!("2026-01-01T00:00:0{}Z", i),
                true,
            )
            .await
            .unwrap();
        }

        let pending = list_pending_for_recipient(&pool, "bob", 3).await.unwrap();
        assert_eq!(pending.len(), 3);
    }
}

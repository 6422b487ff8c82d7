//! `users` table queries

use sqlx::SqlitePool;

use crate::core::constants::DEFAULT_INBOX_LIMIT;
use crate::data::sqlite::SqliteError;

/// Create a user row. Fails with `SqliteError::Conflict` if the username is taken.
pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    password_hash: &str,
    email: &str,
    created_at: &str,
) -> Result<(), SqliteError> {
    let result = sqlx::query(
        "INSERT INTO users (username, password_hash, email, created_at, last_login, inbox_limit) \
         VALUES (?, ?, ?, ?, NULL, ?)",
    )
    .bind(username)
    .bind(password_hash)
    .bind(email)
    .bind(created_at)
    .bind(DEFAULT_INBOX_LIMIT)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(SqliteError::Conflict("Username already exists".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn get_password_hash(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<String>, SqliteError> {
    let hash: Option<String> =
        sqlx::query_scalar("SELECT password_hash FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await?;
    Ok(hash)
}

pub async fn update_last_login(
    pool: &SqlitePool,
    username: &str,
    at: &str,
) -> Result<bool, SqliteError> {
    let result = sqlx::query("UPDATE users SET last_login = ? WHERE username = ?")
        .bind(at)
        .bind(username)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_usernames(pool: &SqlitePool) -> Result<Vec<String>, SqliteError> {
    let usernames: Vec<String> = sqlx::query_scalar("SELECT username FROM users")
        .fetch_all(pool)
        .await?;
    Ok(usernames)
}

/// Returns whether a row was actually removed.
pub async fn delete_user(pool: &SqlitePool, username: &str) -> Result<bool, SqliteError> {
    let result = sqlx::query("DELETE FROM users WHERE username = ?")
        .bind(username)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn get_inbox_limit(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<i64>, SqliteError> {
    let limit: Option<i64> = sqlx::query_scalar("SELECT inbox_limit FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(limit)
}

/// Idempotent: setting the same value twice leaves the same row state.
pub async fn set_inbox_limit(
    pool: &SqlitePool,
    username: &str,
    limit: i64,
) -> Result<bool, SqliteError> {
    let result = sqlx::query("UPDATE users SET inbox_limit = ? WHERE username = ?")
        .bind(limit)
        .bind(username)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
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
    async fn create_and_fetch_user() {
        let pool = fresh_pool().await;
        create_user(&pool, "alice", "hash", "alice@x.com", "2026-01-01T00:00:00Z")
            .await
            .unwrap();

        let hash = get_password_hash(&pool, "alice").await.unwrap();
        assert_eq!(hash.as_deref(), Some("hash"));
        assert_eq!(get_inbox_limit(&pool, "alice").await.unwrap(), Some(50));
    }

    #[tokio::test]
    async fn duplicate_username_is_conflict() {
        let pool = fresh_pool().await;
        create_user(&pool, "carol", "pw", "c@x", "2026-01-01T00:00:00Z")
            .await
            .unwrap();

        let err = create_user(&pool, "carol", "pw2", "c2@x", "2026-01-01T00:00:01Z")
            .await
            .unwrap_err();
        assert!(matches!(err, SqliteError::Conflict(_)));

        // First row must be untouched.
        let hash = get_password_hash(&pool, "carol").await.unwrap();
        assert_eq!(hash.as_deref(), Some("pw"));
    }

    #[tokio::test]
    async fn delete_nonexistent_user_is_noop() {
        let pool = fresh_pool().await;
        let deleted = delete_user(&pool, "ghost").await.unwrap();
        assert!(!deleted);
    }

    #[tokio::test]
    async fn save_settings_is_idempotent() {
        let pool = fresh_pool().await;
        create_user(&pool, "bob", "pw", "b@x", "2026-01-01T00:00:00Z")
            .await
            .unwrap();

        set_inbox_limit(&pool, "bob", 2).await.unwrap();
        set_inbox_limit(&pool, "bob", 2).await.unwrap();
        assert_eq!(get_inbox_limit(&pool, "bob").await.unwrap(), Some(2));
    }
}

//! Credential registration and verification (C2)

use sqlx::SqlitePool;

use crate::data::DataError;
use crate::data::sqlite::repositories::user;
use crate::domain::error::DomainError;
use crate::utils::crypto::sha256_hex;
use crate::utils::time::now_iso8601;

/// Create a user, hashing the password before it ever touches storage.
///
/// Returns `DomainError::DuplicateKey` if the username is taken.
pub async fn register(
    pool: &SqlitePool,
    username: &str,
    password: &str,
    email: &str,
) -> Result<(), DomainError> {
    let hash = sha256_hex(password);
    user::create_user(pool, username, &hash, email, &now_iso8601())
        .await
        .map_err(DataError::from)?;
    Ok(())
}

/// Verify credentials and, on success, record the login time.
pub async fn authenticate(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<(), DomainError> {
    let stored_hash = user::get_password_hash(pool, username)
        .await
        .map_err(DataError::from)?
        .ok_or(DomainError::AuthFailure)?;

    if stored_hash != sha256_hex(password) {
        return Err(DomainError::AuthFailure);
    }

    user::update_last_login(pool, username, &now_iso8601())
        .await
        .map_err(DataError::from)?;
    Ok(())
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
    async fn register_then_authenticate_succeeds() {
        let pool = fresh_pool().await;
        register(&pool, "alice", "hunter2", "alice@x.com")
            .await
            .unwrap();
        authenticate(&pool, "alice", "hunter2").await.unwrap();
    }

    #[tokio::test]
    async fn wrong_password_is_auth_failure() {
        let pool = fresh_pool().await;
        register(&pool, "alice", "hunter2", "alice@x.com")
            .await
            .unwrap();
        let err = authenticate(&pool, "alice", "wrong").await.unwrap_err();
        assert!(matches!(err, DomainError::AuthFailure));
    }

    #[tokio::test]
    async fn unknown_user_is_auth_failure_not_not_found() {
        let pool = fresh_pool().await;
        let err = authenticate(&pool, "ghost", "x").await.unwrap_err();
        assert!(matches!(err, DomainError::AuthFailure));
    }

    #[tokio::test]
    async fn duplicate_registration_is_duplicate_key() {
        let pool = fresh_pool().await;
        register(&pool, "carol", "pw", "c@x").await.unwrap();
        let err = register(&pool, "carol", "pw2", "c2@x").await.unwrap_err();
        assert!(matches!(err, DomainError::DuplicateKey));

        // Original row survives untouched.
        let hash = user::get_password_hash(&pool, "carol").await.unwrap();
        assert_eq!(hash, Some(sha256_hex("pw")));
    }
}

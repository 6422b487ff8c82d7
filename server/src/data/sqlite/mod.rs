//! SQLite database service
//!
//! One `SqliteService` per process, backed by a file named after this
//! server's own network address (e.g. `127.0.0.1_5001.db`) so several
//! servers can share one data directory. WAL mode keeps concurrent RPC
//! handlers from blocking each other on reads while a write is in flight.

pub mod error;
mod migrations;
pub mod repositories;
mod schema;

pub use error::SqliteError;
pub use sqlx::SqlitePool;

use std::sync::Arc;
use std::time::Duration;

use sqlx::ConnectOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::log::LevelFilter;

use crate::core::constants::{
    SQLITE_BUSY_TIMEOUT_SECS, SQLITE_CACHE_SIZE, SQLITE_CHECKPOINT_INTERVAL_SECS,
    SQLITE_MAX_CONNECTIONS, SQLITE_WAL_AUTOCHECKPOINT,
};
use crate::core::storage::{AppStorage, DataSubdir};

pub struct SqliteService {
    pool: SqlitePool,
}

impl SqliteService {
    /// Initialize the database service for this server's own address-derived filename.
    pub async fn init(storage: &AppStorage, db_filename: &str) -> Result<Self, SqliteError> {
        let db_path = storage.subdir(DataSubdir::Sqlite).join(db_filename);

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(SQLITE_BUSY_TIMEOUT_SECS))
            .pragma("cache_size", SQLITE_CACHE_SIZE)
            .pragma("temp_store", "MEMORY")
            .pragma("wal_autocheckpoint", SQLITE_WAL_AUTOCHECKPOINT)
            .log_statements(LevelFilter::Trace);

        let pool = SqlitePoolOptions::new()
            .max_connections(SQLITE_MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        migrations::run_migrations(&pool).await?;

        tracing::debug!(path = %db_path.display(), "SqliteService initialized");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    #[cfg(test)]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn checkpoint(&self) -> Result<(), SqliteError> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await?;
        tracing::debug!("WAL checkpoint completed");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("SQLite pool closed");
    }

    pub fn start_checkpoint_task(
        self: &Arc<Self>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let db = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(SQLITE_CHECKPOINT_INTERVAL_SECS));
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::debug!("WAL checkpoint task shutting down");
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        if let Err(e) = db.checkpoint().await {
                            tracing::warn!("WAL checkpoint failed: {}", e);
                        }
                    }
                }
            }
        })
    }
}

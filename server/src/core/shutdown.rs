//! Centralized shutdown management

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use super::constants::SHUTDOWN_TIMEOUT_SECS;
use crate::data::sqlite::SqliteService;

/// Centralized shutdown service for coordinating graceful shutdown
#[derive(Clone)]
pub struct ShutdownService {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
    store: Arc<SqliteService>,
}

impl ShutdownService {
    pub fn new(store: Arc<SqliteService>) -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
            handles: Arc::new(Mutex::new(Vec::new())),
            store,
        }
    }

    /// Register a background task handle to be awaited during shutdown
    pub async fn register(&self, handle: JoinHandle<()>) {
        self.handles.lock().await.push(handle);
    }

    /// Subscribe to shutdown signal
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }

    /// Trigger shutdown
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    /// Check if shutdown was triggered
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Trigger shutdown and wait for all registered tasks to complete
    ///
    /// Shutdown order: signal tasks to stop, wait for them to drain, then
    /// checkpoint and close the database.
    pub async fn shutdown(&self) {
        tracing::debug!("Initiating graceful shutdown...");
        self.trigger();

        let handles = std::mem::take(&mut *self.handles.lock().await);
        let task_count = handles.len();
        tracing::debug!(
            count = task_count,
            "Waiting for background tasks to finish..."
        );

        let timeout = Duration::from_secs(SHUTDOWN_TIMEOUT_SECS);
        match tokio::time::timeout(timeout, futures::future::join_all(handles)).await {
            Ok(_) => tracing::debug!("All background tasks completed"),
            Err(_) => tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "Timeout waiting for background tasks"
            ),
        }

        tracing::debug!("Closing database connection...");
        if let Err(e) = self.store.checkpoint().await {
            tracing::warn!("SQLite checkpoint failed: {}", e);
        }
        self.store.close().await;

        tracing::debug!("Shutdown complete");
    }

    /// Wait for shutdown signal
    pub fn wait(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut rx = self.rx.clone();
        async move {
            let _ = rx.wait_for(|&v| v).await;
        }
    }

    /// Install OS signal handlers and auto-trigger on Ctrl+C/SIGTERM
    pub fn install_signal_handlers(&self) {
        let service = self.clone();
        tokio::spawn(async move {
            let ctrl_c = async {
                tokio::signal::ctrl_c()
                    .await
                    .expect("Failed to install Ctrl+C handler");
            };

            #[cfg(unix)]
            let terminate = async {
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("Failed to install SIGTERM handler")
                    .recv()
                    .await;
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => tracing::debug!("Received Ctrl+C, shutting down"),
                _ = terminate => tracing::debug!("Received SIGTERM, shutting down"),
            }

            service.trigger();
        });
    }
}

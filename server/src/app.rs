//! Core application

use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use crate::core::banner;
use crate::core::cli;
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::core::storage::AppStorage;
use crate::data::sqlite::SqliteService;
use crate::domain::{DeliveryHub, Membership, PeerInfo};
use crate::rpc::{self, RpcServer};

pub struct CoreApp {
    pub config: AppConfig,
    pub storage: AppStorage,
    pub shutdown: ShutdownService,
    pub db: Arc<SqliteService>,
    pub membership: Arc<Membership>,
    pub hub: Arc<DeliveryHub>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let cli_config = cli::parse();
        let app = Self::init(&cli_config).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &cli::CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        let storage = AppStorage::init().await?;

        let db = Arc::new(SqliteService::init(&storage, &config.server.db_filename()).await?);

        let self_info = PeerInfo {
            id: Uuid::new_v4().to_string(),
            ip: config.server.ip,
            port: config.server.port,
        };
        let membership = Arc::new(Membership::new(self_info));

        if let Some((bootstrap_ip, bootstrap_port)) = config.cluster.bootstrap {
            rpc::join_cluster(&membership, bootstrap_ip, bootstrap_port)
                .await
                .map_err(|e| anyhow::anyhow!("failed to join cluster: {}", e))?;
        } else {
            membership.set_leader_self();
        }

        let hub = Arc::new(DeliveryHub::new());
        let shutdown = ShutdownService::new(db.clone());

        Ok(Self {
            config,
            storage,
            shutdown,
            db,
            membership,
            hub,
        })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        app.start_background_tasks().await?;

        let bootstrap_display = app
            .config
            .cluster
            .bootstrap
            .map(|(ip, port)| format!("{}:{}", ip, port));

        banner::print_banner(
            &app.membership.self_info().id,
            &app.config.server.address(),
            bootstrap_display.as_deref(),
            &app.storage.data_dir().display().to_string(),
        );

        let server = RpcServer::new(
            app.config.server.ip,
            app.config.server.port,
            app.db.clone(),
            app.membership.clone(),
            app.hub.clone(),
        );

        let shutdown_rx = app.shutdown.subscribe();
        server.start(shutdown_rx).await?;

        app.shutdown.shutdown().await;
        Ok(())
    }

    async fn start_background_tasks(&self) -> Result<()> {
        self.shutdown
            .register(self.db.start_checkpoint_task(self.shutdown.subscribe()))
            .await;

        self.shutdown
            .register(rpc::spawn_heartbeat(
                self.membership.clone(),
                self.shutdown.subscribe(),
            ))
            .await;

        tracing::debug!("Background tasks started");
        Ok(())
    }
}

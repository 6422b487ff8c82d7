//! Client application wiring

use anyhow::Result;

use crate::commands;
use crate::connector::Connector;
use crate::core::cli;
use crate::core::config::ClientConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};

pub struct ClientApp {
    config: ClientConfig,
}

impl ClientApp {
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        let cli_config = cli::parse();
        let config = ClientConfig::load(&cli_config)?;
        let command = cli_config.command;
        let app = Self { config };

        tracing::info!(
            ip = %app.config.self_ip,
            port = app.config.self_port,
            servers = app.config.servers.len(),
            "client starting"
        );

        let connector = Connector::new(app.config.servers.clone());
        commands::dispatch(&connector, command).await;
        Ok(())
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
}

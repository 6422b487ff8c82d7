//! Resolved client configuration
//!
//! The server list has no CLI flag of its own (§6): it is read from
//! `CHATD_CLIENT_SERVERS` or, failing that, a config file next to the
//! platform's config directory, matching the precedence env > file used
//! everywhere else in this codebase minus the CLI layer, which has nothing
//! to contribute here.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use config::Config;
use directories::ProjectDirs;

use super::cli::CliConfig;
use super::constants::{APP_NAME, ENV_SERVERS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServerAddr {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl std::fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub self_ip: Ipv4Addr,
    pub self_port: u16,
    pub servers: Vec<ServerAddr>,
}

impl ClientConfig {
    pub fn load(cli: &CliConfig) -> Result<Self> {
        Ok(Self {
            self_ip: cli.ip,
            self_port: cli.port,
            servers: Self::resolve_servers()?,
        })
    }

    fn resolve_servers() -> Result<Vec<ServerAddr>> {
        if let Ok(raw) = std::env::var(ENV_SERVERS) {
            return Self::parse_server_list(&raw);
        }

        let path = Self::config_file_path();
        if path.is_file() {
            let settings = Config::builder()
                .add_source(config::File::from(path.clone()))
                .build()
                .with_context(|| format!("failed to read {}", path.display()))?;
            let raw: Vec<String> = settings
                .get("servers")
                .with_context(|| format!("{} has no `servers` list", path.display()))?;
            return raw.iter().map(|s| Self::parse_one(s)).collect();
        }

        bail!(
            "no server list configured: set {} or create {}",
            ENV_SERVERS,
            path.display()
        )
    }

    fn config_file_path() -> PathBuf {
        ProjectDirs::from("", "", APP_NAME)
            .map(|dirs| dirs.config_dir().join("servers.toml"))
            .unwrap_or_else(|| PathBuf::from("servers.toml"))
    }

    fn parse_server_list(raw: &str) -> Result<Vec<ServerAddr>> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::parse_one)
            .collect()
    }

    fn parse_one(entry: &str) -> Result<ServerAddr> {
        let (ip, port) = entry
            .trim()
            .split_once(':')
            .with_context(|| format!("invalid server address '{entry}': expected ip:port"))?;
        Ok(ServerAddr {
            ip: ip.parse().with_context(|| format!("invalid ip in '{entry}'"))?,
            port: port.parse().with_context(|| format!("invalid port in '{entry}'"))?,
        })
    }
}

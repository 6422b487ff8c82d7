//! Resolved application configuration
//!
//! CLI flags (already merged with their environment variable equivalents by
//! `clap`) are the only input; this module exists so the rest of the
//! application consumes one plain struct instead of reaching back into
//! `CliConfig` or argv.

use std::net::Ipv4Addr;

use anyhow::Result;

use super::cli::CliConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// The filename this server's durable store is kept under, derived from
    /// its own address so multiple servers can coexist on one host.
    pub fn db_filename(&self) -> String {
        format!("{}_{}.db", self.ip, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Bootstrap address to join through. `None` means this process starts
    /// as the initial leader of a new cluster.
    pub bootstrap: Option<(Ipv4Addr, u16)>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cluster: ClusterConfig,
}

impl AppConfig {
    pub fn load(cli: &CliConfig) -> Result<Self> {
        Ok(Self {
            server: ServerConfig {
                ip: cli.ip,
                port: cli.port,
            },
            cluster: ClusterConfig {
                bootstrap: cli.connect,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_filename_is_derived_from_address() {
        let server = ServerConfig {
            ip: "127.0.0.1".parse().unwrap(),
            port: 5001,
        };
        assert_eq!(server.db_filename(), "127.0.0.1_5001.db");
        assert_eq!(server.address(), "127.0.0.1:5001");
    }

    #[test]
    fn app_config_loads_from_cli() {
        let cli = CliConfig {
            ip: "127.0.0.1".parse().unwrap(),
            port: 5002,
            connect: Some(("127.0.0.1".parse().unwrap(), 5001)),
        };
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.server.port, 5002);
        assert_eq!(
            config.cluster.bootstrap,
            Some(("127.0.0.1".parse().unwrap(), 5001))
        );
    }
}

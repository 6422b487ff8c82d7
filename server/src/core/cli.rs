use std::net::Ipv4Addr;

use clap::Parser;

use super::constants::{DEFAULT_PORT, ENV_IP, ENV_IP_CONNECT, ENV_PORT, ENV_PORT_CONNECT};

#[derive(Parser)]
#[command(name = "chatd")]
#[command(version, about = "Replicated chat server", long_about = None)]
pub struct Cli {
    /// Address this server binds and is known by.
    #[arg(long, env = ENV_IP)]
    pub ip: Ipv4Addr,

    /// Port this server binds.
    #[arg(long, env = ENV_PORT, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Bootstrap peer address to join an existing cluster through.
    /// Omit both --ip_connect and --port_connect to start as the initial leader.
    #[arg(long, env = ENV_IP_CONNECT)]
    pub ip_connect: Option<Ipv4Addr>,

    /// Bootstrap peer port.
    #[arg(long, env = ENV_PORT_CONNECT)]
    pub port_connect: Option<u16>,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub ip: Ipv4Addr,
    pub port: u16,
    pub connect: Option<(Ipv4Addr, u16)>,
}

impl CliConfig {
    /// Whether this process should join an existing cluster rather than
    /// start as the initial leader. Both connect args must be present.
    pub fn is_join(&self) -> bool {
        self.connect.is_some()
    }
}

/// Parse CLI arguments into a resolved configuration.
pub fn parse() -> CliConfig {
    let cli = Cli::parse();
    let connect = match (cli.ip_connect, cli.port_connect) {
        (Some(ip), Some(port)) => Some((ip, port)),
        (None, None) => None,
        _ => {
            eprintln!("--ip_connect and --port_connect must be given together; ignoring partial bootstrap address");
            None
        }
    };
    CliConfig {
        ip: cli.ip,
        port: cli.port,
        connect,
    }
}

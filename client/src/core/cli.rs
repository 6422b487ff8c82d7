use std::net::Ipv4Addr;

use clap::{Parser, Subcommand};

use super::constants::{DEFAULT_PENDING_LIMIT, DEFAULT_PORT, ENV_IP, ENV_PORT};

#[derive(Parser)]
#[command(name = "chatc")]
#[command(version, about = "Headless chat client", long_about = None)]
pub struct Cli {
    /// Address this client instance is known by (logged, not bound).
    #[arg(long, env = ENV_IP)]
    pub ip: Ipv4Addr,

    /// Port this client instance is known by (logged, not bound).
    #[arg(long, env = ENV_PORT, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Create an account.
    Register {
        username: String,
        password: String,
        email: String,
    },
    /// Authenticate an existing account.
    Login { username: String, password: String },
    /// List every registered username.
    Users,
    /// Read a user's inbox limit.
    GetSettings { username: String },
    /// Set a user's inbox limit.
    SaveSettings { username: String, setting: i32 },
    /// Remove an account.
    DeleteAccount { username: String },
    /// Send a point-to-point message.
    Send {
        sender: String,
        recipient: String,
        body: String,
    },
    /// Fetch (and consume) a user's queued messages.
    Pending {
        username: String,
        #[arg(long, default_value_t = DEFAULT_PENDING_LIMIT)]
        limit: i32,
    },
    /// Fetch a user's delivered message history.
    History { username: String },
    /// Stream messages pushed to a user in real time until interrupted.
    Monitor { username: String },
    /// List the servers the currently connected server knows about.
    Servers,
}

/// Configuration derived from CLI arguments.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub ip: Ipv4Addr,
    pub port: u16,
    pub command: Commands,
}

pub fn parse() -> CliConfig {
    let cli = Cli::parse();
    CliConfig {
        ip: cli.ip,
        port: cli.port,
        command: cli.command,
    }
}

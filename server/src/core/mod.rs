//! Core application infrastructure

pub(crate) mod banner;
pub mod cli;
pub mod config;
pub mod constants;
pub mod shutdown;
pub mod storage;

pub use cli::CliConfig;
pub use config::{AppConfig, ClusterConfig, ServerConfig};
pub use shutdown::ShutdownService;
pub use storage::{AppStorage, DataSubdir};

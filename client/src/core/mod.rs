//! Core client infrastructure

pub mod cli;
pub mod config;
pub mod constants;

pub use cli::CliConfig;
pub use config::{ClientConfig, ServerAddr};

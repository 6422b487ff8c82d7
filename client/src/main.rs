mod app;
mod commands;
mod connector;
mod core;

use crate::app::ClientApp;

#[tokio::main]
async fn main() {
    if let Err(e) = ClientApp::run().await {
        eprintln!("\nError: {}\n", e);
        std::process::exit(1);
    }
}

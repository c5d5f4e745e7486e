mod cli;
mod client;
mod config;
mod engine;
mod history;
mod ipc;
mod panel;
mod platform;
mod trigger;

use clap::Parser;
use cli::{Cli, Command};
use config::EngineConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Daemon {
            max_entries,
            toggle_key,
            primary,
            capture_delay_ms,
            no_paste,
        } => {
            let config = match EngineConfig::from_args(
                max_entries,
                &toggle_key,
                &primary,
                capture_delay_ms,
                !no_paste,
            ) {
                Ok(config) => config,
                Err(e) => {
                    tracing::error!(error = %e, "invalid configuration");
                    eprintln!("clipstack daemon: {e}");
                    std::process::exit(1);
                }
            };
            if let Err(e) = engine::run(config).await {
                tracing::error!(error = %e, "daemon failed");
                eprintln!("clipstack daemon: {e}");
                std::process::exit(1);
            }
        }
        Command::Client { action } => {
            if let Err(e) = client::run(action).await {
                tracing::error!(error = %e, "client failed");
                eprintln!("clipstack client: {e}");
                std::process::exit(1);
            }
        }
    }
}

//! relay-agent CLI: webhook gateway + background job monitoring.
//!
//! Logging: set `RUST_LOG=relay_agent=debug` (or `info`, `warn`) to control
//! agent logs on stderr.

mod cli;
mod nodes;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use relay_agent::load_runtime_settings;

use crate::cli::{Cli, Command};
use crate::nodes::run_serve_mode;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("relay_agent=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let settings = load_runtime_settings(cli.config.as_deref());

    match cli.command {
        Command::Serve { bind } => run_serve_mode(bind, settings).await,
    }
}

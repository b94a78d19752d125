//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// relay-agent entry point.
#[derive(Debug, Parser)]
#[command(
    name = "relay-agent",
    about = "Chat-bot backend that monitors long-running media jobs and relays results to users"
)]
pub struct Cli {
    /// Path to the YAML settings file (default: ./relay.yaml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available run modes.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the webhook gateway with background job monitoring.
    Serve {
        /// Bind address override (e.g. `0.0.0.0:8080`).
        #[arg(long)]
        bind: Option<String>,
    },
}

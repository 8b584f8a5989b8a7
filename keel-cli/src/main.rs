//! Keel CLI
//!
//! Command-line interface for inspecting and steering jobs on a Keel engine.

mod commands;
mod config;
mod id_resolver;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "keel")]
#[command(about = "Keel job engine CLI", long_about = None)]
struct Cli {
    /// Engine URL
    #[arg(long, env = "KEEL_ENGINE_URL", default_value = "http://localhost:8080")]
    engine_url: String,

    /// Caller identity the engine checks job ownership against
    #[arg(long, env = "KEEL_CALLER_ID")]
    caller: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        engine_url: cli.engine_url,
        caller_id: cli.caller,
    };

    handle_command(cli.command, &config).await
}

//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod governor;
mod job;

pub use governor::GovernorCommands;
pub use job::JobCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Job management
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Execution slot introspection
    Governor {
        #[command(subcommand)]
        command: GovernorCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Job { command } => job::handle_job_command(command, config).await,
        Commands::Governor { command } => {
            governor::handle_governor_command(command, config).await
        }
    }
}

//! Governor command handlers

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;

use crate::config::Config;

#[derive(Subcommand)]
pub enum GovernorCommands {
    /// Show execution slots and their current holders
    Status,
}

pub async fn handle_governor_command(command: GovernorCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        GovernorCommands::Status => {
            let status = client
                .governor_status()
                .await
                .context("Failed to fetch governor status")?;

            println!(
                "{} {}/{} slot(s) in use",
                "Governor:".bold(),
                status.holders.len(),
                status.slots
            );
            for holder in &status.holders {
                println!(
                    "  {} Job {}  admitted {}  deadline {}",
                    "▸".cyan(),
                    holder.job_id.to_string().dimmed(),
                    holder.admitted_at.format("%Y-%m-%d %H:%M:%S"),
                    holder.deadline.format("%H:%M:%S").to_string().yellow()
                );
            }
            Ok(())
        }
    }
}

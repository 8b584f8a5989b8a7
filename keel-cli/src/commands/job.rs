//! Job command handlers
//!
//! Handles the owner-facing job commands: listing, inspecting, lifecycle
//! transitions, and reading the action log.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use keel_client::EngineClient;
use keel_core::domain::action::{ActionKind, ActionLogEntry};
use keel_core::domain::job::{JobRecord, JobStatus};
use keel_core::dto::job::CreateJob;

use crate::config::Config;
use crate::id_resolver::resolve_job_id;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// List your jobs, newest first
    List,
    /// Show a job's full record
    Show {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// Create a job
    Create {
        /// Kind label, e.g. "deep-research"
        kind: String,

        /// Initial step name
        #[arg(long)]
        step: Option<String>,
    },
    /// Start a created job
    Start {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// Pause a running job, keeping its checkpoint
    Pause {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// Resume a paused job from its last checkpoint
    Resume {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// Reset a finished job to created
    Restart {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// Cancel a job
    Cancel {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// Drop a job's checkpoint
    ClearCheckpoint {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// Show a job's action log
    Actions {
        /// Job ID or unambiguous prefix
        id: String,
    },
}

/// Handle job commands
///
/// Routes job subcommands to their respective handlers.
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        JobCommands::List => list_jobs(&client).await,
        JobCommands::Show { id } => show_job(&client, &id).await,
        JobCommands::Create { kind, step } => create_job(&client, kind, step).await,
        JobCommands::Start { id } => {
            let job_id = resolve_job_id(&client, &id).await?;
            let started = client.start_job(job_id).await.context("Failed to start job")?;
            println!("{} Job {} started", "✓".green(), job_id.to_string().cyan());
            if let Some(preempted) = started.preempted {
                println!("  {} preempted job {}", "!".yellow(), preempted);
            }
            Ok(())
        }
        JobCommands::Pause { id } => {
            let job_id = resolve_job_id(&client, &id).await?;
            let job = client.pause_job(job_id).await.context("Failed to pause job")?;
            println!(
                "{} Job {} paused at {} ({:.1}%)",
                "✓".green(),
                job_id.to_string().cyan(),
                job.step,
                job.progress
            );
            Ok(())
        }
        JobCommands::Resume { id } => {
            let job_id = resolve_job_id(&client, &id).await?;
            let resumed = client.resume_job(job_id).await.context("Failed to resume job")?;
            println!("{} Job {} resumed", "✓".green(), job_id.to_string().cyan());
            match resumed.checkpoint_sequence {
                Some(sequence) => println!("  from checkpoint #{}", sequence),
                None => println!("  {}", "no checkpoint, starting over".yellow()),
            }
            if let Some(preempted) = resumed.preempted {
                println!("  {} preempted job {}", "!".yellow(), preempted);
            }
            Ok(())
        }
        JobCommands::Restart { id } => {
            let job_id = resolve_job_id(&client, &id).await?;
            client.restart_job(job_id).await.context("Failed to restart job")?;
            println!("{} Job {} restarted", "✓".green(), job_id.to_string().cyan());
            Ok(())
        }
        JobCommands::Cancel { id } => {
            let job_id = resolve_job_id(&client, &id).await?;
            client.cancel_job(job_id).await.context("Failed to cancel job")?;
            println!("{} Job {} cancelled", "✓".green(), job_id.to_string().cyan());
            Ok(())
        }
        JobCommands::ClearCheckpoint { id } => {
            let job_id = resolve_job_id(&client, &id).await?;
            client
                .clear_checkpoint(job_id)
                .await
                .context("Failed to clear checkpoint")?;
            println!(
                "{} Checkpoint cleared for job {}",
                "✓".green(),
                job_id.to_string().cyan()
            );
            Ok(())
        }
        JobCommands::Actions { id } => show_actions(&client, &id).await,
    }
}

async fn list_jobs(client: &EngineClient) -> Result<()> {
    let jobs = client.list_jobs().await.context("Failed to list jobs")?;

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
    } else {
        println!("{}", format!("Found {} job(s):", jobs.len()).bold());
        println!();
        for job in jobs {
            print_job_summary(&job);
        }
    }

    Ok(())
}

async fn show_job(client: &EngineClient, id: &str) -> Result<()> {
    let job_id = resolve_job_id(client, id).await?;
    let job = client.get_job(job_id).await.context("Failed to fetch job")?;
    print_job_details(&job);
    Ok(())
}

async fn create_job(client: &EngineClient, kind: String, step: Option<String>) -> Result<()> {
    let job = client
        .create_job(CreateJob { kind, step })
        .await
        .context("Failed to create job")?;

    println!("{} Job created", "✓".green());
    println!("  ID:   {}", job.id().to_string().cyan());
    println!("  Kind: {}", job.kind);
    Ok(())
}

async fn show_actions(client: &EngineClient, id: &str) -> Result<()> {
    let job_id = resolve_job_id(client, id).await?;
    let entries = client
        .list_actions(job_id)
        .await
        .context("Failed to fetch action log")?;

    if entries.is_empty() {
        println!("{}", "No actions recorded for this job.".yellow());
    } else {
        println!("{}", format!("Action log for job {}:", job_id).bold());
        println!("{}", "─".repeat(80).dimmed());
        for entry in &entries {
            print_action_entry(entry);
        }
        println!("{}", "─".repeat(80).dimmed());
    }

    Ok(())
}

fn print_job_summary(job: &JobRecord) {
    println!("  {} Job {}", "▸".cyan(), job.id().to_string().dimmed());
    println!("    Kind:     {}", job.kind);
    println!("    Status:   {}", colorize_status(job));
    println!("    Step:     {} ({:.1}%)", job.step, job.progress);
    println!(
        "    Created:  {}",
        job.created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

fn print_job_details(job: &JobRecord) {
    println!("{}", "Job Details:".bold());
    println!("  ID:            {}", job.id().to_string().cyan());
    println!("  Kind:          {}", job.kind);
    println!("  Status:        {}", colorize_status(job));
    println!("  Step:          {}", job.step);
    println!("  Progress:      {:.1}%", job.progress);
    println!(
        "  Created:       {}",
        job.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "  Last activity: {}",
        job.last_activity_at.format("%Y-%m-%d %H:%M:%S")
    );

    match &job.checkpoint {
        Some(checkpoint) => {
            println!("\n{}", "Checkpoint:".bold());
            println!("  Sequence: #{}", checkpoint.sequence);
            println!("  Step:     {} ({:.1}%)", checkpoint.step, checkpoint.progress);
            println!("  Size:     {} bytes", checkpoint.data.len());
            println!(
                "  Saved:    {}",
                checkpoint.saved_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
        None => println!("\n{}", "No checkpoint".dimmed()),
    }

    if let Some(result) = job.result() {
        println!("\n{}", "Result:".bold());
        match serde_json::to_string_pretty(result) {
            Ok(pretty) => println!("{}", pretty),
            Err(_) => println!("{:?}", result),
        }
    }

    if let Some(error) = job.error() {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());
    }
}

fn print_action_entry(entry: &ActionLogEntry) {
    let kind = entry.kind.as_str().to_uppercase();
    let kind_colored = match entry.kind {
        ActionKind::Reasoning => kind.dimmed(),
        ActionKind::Decision => kind.magenta(),
        ActionKind::Action => kind.cyan(),
        ActionKind::Observation => kind.green(),
    };

    println!(
        "{} [{}] {}",
        entry.recorded_at.format("%H:%M:%S").to_string().dimmed(),
        kind_colored,
        entry.message
    );
    if let Some(detail) = &entry.detail {
        println!("           {}", detail.to_string().dimmed());
    }
}

fn colorize_status(job: &JobRecord) -> ColoredString {
    let status = job.status();
    let label = match job.cancel_cause() {
        Some(cause) => format!("{} ({})", status, cause),
        None => status.to_string(),
    };
    match status {
        JobStatus::Created => label.yellow(),
        JobStatus::Running => label.cyan(),
        JobStatus::Paused => label.blue(),
        JobStatus::Completed => label.green(),
        JobStatus::Failed => label.red(),
        JobStatus::Cancelled => label.dimmed(),
    }
}

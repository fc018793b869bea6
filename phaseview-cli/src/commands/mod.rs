//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod action;
mod phase;
mod pipeline;

pub use phase::PhaseCommands;
pub use pipeline::PipelineCommands;

use anyhow::Result;
use clap::Subcommand;
use uuid::Uuid;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show the engine's name and labels
    System,
    /// Pipeline inspection
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// Phase inspection
    Phase {
        #[command(subcommand)]
        command: PhaseCommands,
    },
    /// Promote a phase from its upstream
    Promote {
        /// Pipeline name
        pipeline: String,
        /// Phase to promote
        phase: String,
    },
    /// Perform the promotion along an edge
    Perform {
        /// Pipeline name
        pipeline: String,
        /// Upstream phase
        from: String,
        /// Downstream phase
        to: String,
    },
    /// Roll a phase back to a recorded version
    Rollback {
        /// Pipeline name
        pipeline: String,
        /// Phase to roll back
        phase: String,
        /// Version from the phase history
        version: Uuid,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
///
/// # Returns
/// Result indicating success or failure
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::System => pipeline::show_system(config).await,
        Commands::Pipeline { command } => pipeline::handle_pipeline_command(command, config).await,
        Commands::Phase { command } => phase::handle_phase_command(command, config).await,
        Commands::Promote { pipeline, phase } => action::promote(config, &pipeline, &phase).await,
        Commands::Perform { pipeline, from, to } => {
            action::perform(config, &pipeline, &from, &to).await
        }
        Commands::Rollback {
            pipeline,
            phase,
            version,
        } => action::rollback(config, &pipeline, &phase, version).await,
    }
}

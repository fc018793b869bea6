//! Phase command handlers
//!
//! Handles phase detail and history reads.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Subcommand;
use colored::*;
use phaseview_console::history::{relative_time, utc_string};
use phaseview_core::domain::phase::Phase;
use phaseview_core::domain::state::State;

use crate::config::Config;
use phaseview_client::EngineClient;

/// Phase subcommands
#[derive(Subcommand)]
pub enum PhaseCommands {
    /// Get phase details
    Get {
        /// Pipeline name
        pipeline: String,
        /// Phase name
        phase: String,
    },
    /// List the recorded states of a phase, newest first
    History {
        /// Pipeline name
        pipeline: String,
        /// Phase name
        phase: String,
    },
}

/// Handle phase commands
pub async fn handle_phase_command(command: PhaseCommands, config: &Config) -> Result<()> {
    let client = EngineClient::new(&config.engine_url);

    match command {
        PhaseCommands::Get { pipeline, phase } => {
            let phase = client.get_phase(&pipeline, &phase).await?;
            print_phase_details(&pipeline, &phase);
            Ok(())
        }
        PhaseCommands::History { pipeline, phase } => {
            let states = client.get_phase_history(&pipeline, &phase).await?;
            if states.is_empty() {
                println!("{}", "No recorded states.".yellow());
            } else {
                println!(
                    "{}",
                    format!("History of {}/{} ({} state(s)):", pipeline, phase, states.len()).bold()
                );
                println!();
                let now = Utc::now();
                for (index, state) in states.iter().enumerate() {
                    println!("{}", history_line(index, state, now));
                }
            }
            Ok(())
        }
    }
}

/// One history entry; index 0 is the current state
fn history_line(index: usize, state: &State, now: DateTime<Utc>) -> String {
    let marker = if index == 0 {
        " current".green().to_string()
    } else {
        String::new()
    };

    format!(
        "  [{}] {}  {}  {} ({}){}",
        index,
        state.version.to_string().cyan(),
        state.digest.as_deref().unwrap_or("-"),
        relative_time(state.recorded_at, now),
        utc_string(state.recorded_at).dimmed(),
        marker
    )
}

/// Print detailed phase information
fn print_phase_details(pipeline: &str, phase: &Phase) {
    println!("{}", "Phase Details:".bold());
    println!("  Name:       {}", phase.name.cyan());
    println!("  Pipeline:   {}", pipeline);
    println!("  Depends on: {}", phase.dependency().unwrap_or("-"));
    println!("  Source:     {}", phase.source.kind);
    println!("  Digest:     {}", phase.digest().unwrap_or("-"));
    if let Some(image) = phase.image_url() {
        println!("  Image:      {}", image);
    }
    match phase.is_synced() {
        Some(true) => println!("  Sync:       {}", "synced".green()),
        Some(false) => println!("  Sync:       {}", "out of sync".yellow()),
        None => {}
    }

    let mut labels: Vec<_> = phase.labels.iter().collect();
    labels.sort();
    if !labels.is_empty() {
        println!("\n{}", "Labels:".bold());
        for (key, value) in labels {
            println!("  {} = {}", key, value.dimmed());
        }
    }

    let mut annotations: Vec<_> = phase.annotations.iter().collect();
    annotations.sort();
    if !annotations.is_empty() {
        println!("\n{}", "Annotations:".bold());
        for (key, value) in annotations {
            println!("  {} = {}", key, value.dimmed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::collections::HashMap;
    use uuid::Uuid;

    #[test]
    fn test_history_line() {
        colored::control::set_override(false);
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();
        let version = Uuid::new_v4();
        let state = State {
            version,
            digest: Some("sha256:abc".to_string()),
            recorded_at: now - Duration::hours(3),
            annotations: HashMap::new(),
            resource: None,
        };

        assert_eq!(
            history_line(0, &state, now),
            format!(
                "  [0] {}  sha256:abc  about 3 hours ago (Thu, 02 May 2024 09:00:00 GMT) current",
                version
            )
        );
        assert!(!history_line(1, &state, now).ends_with("current"));
    }
}

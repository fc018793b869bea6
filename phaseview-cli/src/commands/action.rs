//! Action command handlers
//!
//! Promotions and rollbacks. The engine applies them asynchronously; these
//! commands only report whether it accepted them.

use anyhow::Result;
use colored::*;
use phaseview_client::{EngineClient, PromotionResult};
use uuid::Uuid;

use crate::config::Config;

/// Promote a phase through the phase-oriented endpoint
pub async fn promote(config: &Config, pipeline: &str, phase: &str) -> Result<()> {
    let client = EngineClient::new(&config.engine_url);
    client.promote_phase(pipeline, phase).await?;

    println!("{}", "✓ Phase promotion scheduled".green().bold());
    println!("  Phase: {}/{}", pipeline, phase.cyan());

    Ok(())
}

/// Perform the promotion along the edge `from` -> `to`
pub async fn perform(config: &Config, pipeline: &str, from: &str, to: &str) -> Result<()> {
    let client = EngineClient::new(&config.engine_url);
    let result = client.perform_edge(pipeline, from, to).await?;

    println!("{}", promotion_message(&result).green().bold());
    println!("  Edge: {}/{} → {}", pipeline, from, to.cyan());

    Ok(())
}

/// Roll a phase back to a recorded version
pub async fn rollback(config: &Config, pipeline: &str, phase: &str, version: Uuid) -> Result<()> {
    let client = EngineClient::new(&config.engine_url);
    client.rollback_phase(pipeline, phase, version).await?;

    println!("{}", "✓ Phase version updated".green().bold());
    println!("  Phase:   {}/{}", pipeline, phase.cyan());
    println!("  Version: {}", version.to_string().dimmed());

    Ok(())
}

fn promotion_message(result: &PromotionResult) -> String {
    match result.proposal_url() {
        Some(url) => format!("✓ Phase promotion proposed: {}", url),
        None => "✓ Phase promotion scheduled".to_string(),
    }
}

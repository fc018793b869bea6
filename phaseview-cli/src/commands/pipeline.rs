//! Pipeline command handlers
//!
//! Handles the engine descriptor and pipeline reads, including the laid
//! out dependency graph.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use phaseview_console::render::{self, RenderState};
use phaseview_core::domain::pipeline::Pipeline;
use phaseview_graph::{Graph, LayoutOptions};

use crate::config::Config;
use phaseview_client::EngineClient;

/// Pipeline subcommands
#[derive(Subcommand)]
pub enum PipelineCommands {
    /// List all pipelines
    List,
    /// Get pipeline details
    Get {
        /// Pipeline name
        name: String,
    },
    /// Show the laid out graph of one pipeline, or of all of them
    Graph {
        /// Pipeline name; every pipeline when omitted
        name: Option<String>,

        /// Print nodes and edges as JSON instead of drawing them
        #[arg(long)]
        json: bool,
    },
}

/// Handle pipeline commands
///
/// Routes pipeline subcommands to their respective handlers.
///
/// # Arguments
/// * `command` - The pipeline command to execute
/// * `config` - The CLI configuration
pub async fn handle_pipeline_command(command: PipelineCommands, config: &Config) -> Result<()> {
    let client = EngineClient::new(&config.engine_url);

    match command {
        PipelineCommands::List => list_pipelines(&client).await,
        PipelineCommands::Get { name } => get_pipeline(&client, &name).await,
        PipelineCommands::Graph { name, json } => show_graph(&client, name.as_deref(), json).await,
    }
}

/// Show the engine descriptor
pub async fn show_system(config: &Config) -> Result<()> {
    let client = EngineClient::new(&config.engine_url);
    let system = client.get_system().await?;

    println!("{}", "Engine:".bold());
    println!("  Name:   {}", system.name.cyan());
    println!("  URL:    {}", client.base_url().dimmed());
    if !system.labels.is_empty() {
        println!("  Labels: {}", sorted_pairs(system.labels.iter()).join(", "));
    }

    Ok(())
}

/// List all pipelines
async fn list_pipelines(client: &EngineClient) -> Result<()> {
    let pipelines = client.list_pipelines().await?;

    if pipelines.is_empty() {
        println!("{}", "No pipelines found.".yellow());
    } else {
        println!(
            "{}",
            format!("Found {} pipeline(s):", pipelines.len()).bold()
        );
        println!();
        for pipeline in pipelines {
            print_pipeline_summary(&pipeline);
        }
    }

    Ok(())
}

/// Get and display a single pipeline
async fn get_pipeline(client: &EngineClient, name: &str) -> Result<()> {
    let pipeline = client.get_pipeline(name).await?;

    print_pipeline_details(&pipeline);

    Ok(())
}

/// Build, lay out and print a graph
async fn show_graph(client: &EngineClient, name: Option<&str>, json: bool) -> Result<()> {
    let pipelines = match name {
        Some(name) => vec![client.get_pipeline(name).await?],
        None => client.list_pipelines().await?,
    };

    let graph = laid_out(&pipelines)?;

    if json {
        let out = serde_json::to_string_pretty(&graph).context("Failed to serialize graph")?;
        println!("{}", out);
    } else if graph.nodes.is_empty() {
        println!("{}", "No pipelines found.".yellow());
    } else {
        println!("{}", render::render(&graph, &RenderState::default()));
    }

    Ok(())
}

/// Lays the pipelines out the way the console draws them
fn laid_out(pipelines: &[Pipeline]) -> Result<Graph> {
    let mut graph = phaseview_graph::build(pipelines);
    for node in &mut graph.nodes {
        if node.is_phase() {
            node.measured = Some(render::measure(node));
        }
    }

    phaseview_graph::layout(&graph, &LayoutOptions::compact()).context("Failed to lay out graph")
}

fn sorted_pairs<'a>(pairs: impl Iterator<Item = (&'a String, &'a String)>) -> Vec<String> {
    let mut pairs: Vec<String> = pairs.map(|(k, v)| format!("{}={}", k, v)).collect();
    pairs.sort();
    pairs
}

/// Print a pipeline summary
fn print_pipeline_summary(pipeline: &Pipeline) {
    println!("  {} {}", "▸".cyan(), pipeline.name.bold());
    println!(
        "    Phases: {}",
        pipeline
            .phases
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
            .dimmed()
    );
    if !pipeline.labels.is_empty() {
        println!(
            "    Labels: {}",
            sorted_pairs(pipeline.labels.iter()).join(", ").dimmed()
        );
    }
    println!();
}

/// Print detailed pipeline information
fn print_pipeline_details(pipeline: &Pipeline) {
    println!("{}", "Pipeline Details:".bold());
    println!("  Name:   {}", pipeline.name.cyan());
    if !pipeline.labels.is_empty() {
        println!("  Labels: {}", sorted_pairs(pipeline.labels.iter()).join(", "));
    }

    println!("\n{}", "Phases:".bold());
    for phase in &pipeline.phases {
        let upstream = phase
            .dependency()
            .map(|d| format!("← {}", d))
            .unwrap_or_default();
        let sync = match phase.is_synced() {
            Some(true) => "synced".green(),
            Some(false) => "out of sync".yellow(),
            None => "".normal(),
        };
        println!(
            "  {} {:<16} {:<16} {}",
            "▸".cyan(),
            phase.name.bold(),
            upstream.dimmed(),
            sync
        );
    }

    let edges = pipeline.dependency_edges();
    if !edges.is_empty() {
        println!("\n{}", "Edges:".bold());
        for edge in edges {
            println!(
                "  {}/{} → {}/{}",
                edge.from.pipeline, edge.from.name, edge.to.pipeline, edge.to.name
            );
        }
    }
}

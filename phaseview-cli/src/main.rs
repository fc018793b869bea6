//! Phaseview CLI
//!
//! One-shot commands against the pipeline engine.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "phaseview")]
#[command(about = "Pipeline engine CLI", long_about = None)]
struct Cli {
    /// Engine API base URL
    #[arg(
        long,
        env = "PHASEVIEW_ENGINE_URL",
        default_value = "http://localhost:8080/api/v1"
    )]
    engine_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        engine_url: cli.engine_url,
    };

    handle_command(cli.command, &config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use commands::{PhaseCommands, PipelineCommands};

    #[test]
    fn test_parse_graph_command() {
        let cli = Cli::try_parse_from([
            "phaseview",
            "--engine-url",
            "http://engine:9000/api/v1",
            "pipeline",
            "graph",
            "payments",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.engine_url, "http://engine:9000/api/v1");
        assert!(matches!(
            cli.command,
            Commands::Pipeline {
                command: PipelineCommands::Graph { name: Some(ref n), json: true }
            } if n == "payments"
        ));
    }

    #[test]
    fn test_parse_phase_and_actions() {
        let cli = Cli::try_parse_from(["phaseview", "phase", "history", "payments", "prod"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Phase {
                command: PhaseCommands::History { .. }
            }
        ));

        let cli = Cli::try_parse_from(["phaseview", "perform", "payments", "staging", "prod"]).unwrap();
        assert!(matches!(cli.command, Commands::Perform { .. }));

        let cli = Cli::try_parse_from([
            "phaseview",
            "rollback",
            "payments",
            "prod",
            "0b8f2c4e-3c1d-4f1a-9d62-7f0e6c2d9a11",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Rollback { .. }));
    }

    #[test]
    fn test_rollback_requires_uuid_version() {
        assert!(Cli::try_parse_from(["phaseview", "rollback", "payments", "prod", "v2"]).is_err());
    }
}

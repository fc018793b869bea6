//! Operator commands
//!
//! One command per stdin line, parsed with clap so usage errors read the
//! same as the CLI's.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "phaseview", no_binary_name = true, disable_help_flag = true)]
struct Line {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Switch the view to one pipeline, or `all`
    View { target: String },
    /// Select a phase (`name`, `pipeline/name` or node id)
    Select { phase: String },
    /// Collapse or expand the detail panel
    Toggle,
    /// Promote a phase from its upstream
    Promote { from: String, to: String },
    /// Roll a phase back to a history entry
    Rollback { phase: String, index: usize },
    /// Show the history of a phase
    History { phase: String },
    /// Show one entry of the open history
    Details { index: usize },
    /// Close the open dialog
    Close,
    /// Confirm the pending action
    Confirm,
    /// Cancel the pending action
    Cancel,
    /// Fetch the view now
    Refresh,
    /// Leave the console
    #[command(alias = "exit")]
    Quit,
}

impl Command {
    /// Parses one input line; blank lines yield `Ok(None)`
    pub fn parse_line(line: &str) -> Result<Option<Self>, String> {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            return Ok(None);
        }

        Line::try_parse_from(words)
            .map(|line| Some(line.command))
            .map_err(|e| {
                e.to_string()
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .trim_start_matches("error: ")
                    .to_string()
            })
    }
}

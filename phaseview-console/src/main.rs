//! Phaseview Console
//!
//! Live view of an engine's pipelines, drawn to the terminal.
//!
//! The console waits for the engine, then polls the viewed pipelines on an
//! interval and redraws whenever a fetch, an action answer, a history
//! answer or an operator command changes the screen. Commands are read one
//! per line from stdin.

use anyhow::{Context, Result};
use chrono::Utc;
use phaseview_client::EngineClient;
use phaseview_console::config::Config;
use phaseview_console::console::{Console, Flow};
use phaseview_console::repository::{
    HttpActionRepository, HttpHistoryRepository, HttpPipelineRepository,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr so they stay off the canvas
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "phaseview_console=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Phaseview Console");

    let config = load_config()?;
    info!(
        "Loaded configuration: engine_url={}, view={}, poll_interval={:?}, request_timeout={:?}",
        config.engine_url, config.view, config.poll_interval, config.request_timeout
    );

    // Bounds every fetch, so hung requests cannot pile up behind the poller
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let client = EngineClient::with_client(config.engine_url.clone(), http);
    connect_with_retry(&client).await?;

    let (mut console, mut inbox) = Console::new(
        Arc::new(HttpPipelineRepository::new(client.clone())),
        Arc::new(HttpActionRepository::new(client.clone())),
        Arc::new(HttpHistoryRepository::new(client)),
    );

    let mut ticker = tokio::time::interval(config.poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The view's first fetch is started right away; skip the immediate tick
    ticker.tick().await;

    console.view(config.view.clone());
    draw(&console)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let redraw = tokio::select! {
            _ = ticker.tick() => {
                console.tick();
                false
            }
            Some(outcome) = inbox.fetches.recv() => console.on_fetch(outcome),
            Some(done) = inbox.actions.recv() => console.on_action(done),
            Some(outcome) = inbox.history.recv() => console.on_history(outcome),
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    info!("Input closed");
                    break;
                };
                match console.execute(&line) {
                    Flow::Quit => break,
                    Flow::Continue => true,
                }
            }
        };

        if redraw {
            draw(&console)?;
        }
    }

    console.shutdown();
    info!("Console stopped");
    Ok(())
}

/// Clears the terminal and draws the current screen
fn draw(console: &Console) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "\x1b[2J\x1b[H{}\n\n> ", console.screen(Utc::now()))?;
    stdout.flush().context("Failed to write to the terminal")
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<Config> {
    match Config::from_env() {
        Ok(config) => {
            config.validate()?;
            Ok(config)
        }
        Err(e) => {
            info!("Failed to load config from environment ({}), using defaults", e);
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Waits for the engine with exponential backoff
///
/// The console is often started alongside the engine, which may not be
/// serving yet.
async fn connect_with_retry(client: &EngineClient) -> Result<()> {
    const MAX_RETRIES: u32 = 10;
    const INITIAL_DELAY_MS: u64 = 500;
    const MAX_DELAY_MS: u64 = 30_000;

    let mut attempt = 0;
    let mut delay_ms = INITIAL_DELAY_MS;

    loop {
        attempt += 1;

        match client.get_system().await {
            Ok(system) => {
                info!(
                    "Connected to engine {} after {} attempt(s)",
                    system.name, attempt
                );
                return Ok(());
            }
            Err(e) => {
                if attempt >= MAX_RETRIES {
                    error!("Engine unreachable after {} attempts", MAX_RETRIES);
                    return Err(anyhow::anyhow!(
                        "Failed to reach engine at {}: {}",
                        client.base_url(),
                        e.user_message()
                    ));
                }

                warn!(
                    "Engine not reachable (attempt {}/{}): {}",
                    attempt,
                    MAX_RETRIES,
                    e.user_message()
                );
                warn!("Retrying in {} ms...", delay_ms);

                tokio::time::sleep(Duration::from_millis(delay_ms)).await;

                // Exponential backoff with cap
                delay_ms = (delay_ms * 2).min(MAX_DELAY_MS);
            }
        }
    }
}

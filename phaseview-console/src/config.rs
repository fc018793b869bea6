//! Console configuration
//!
//! Defines the engine connection, the initial view and the polling cadence.

use std::time::Duration;

use crate::sync::ViewTarget;

/// Default engine API base URL
pub const DEFAULT_ENGINE_URL: &str = "http://localhost:8080/api/v1";

/// Console configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Engine API base URL (e.g., "http://localhost:8080/api/v1")
    pub engine_url: String,

    /// What the console shows on startup
    pub view: ViewTarget,

    /// How often the viewed pipelines are re-fetched
    pub poll_interval: Duration,

    /// Upper bound on a single engine request
    pub request_timeout: Duration,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(engine_url: String, view: ViewTarget) -> Self {
        Self {
            engine_url,
            view,
            poll_interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - PHASEVIEW_ENGINE_URL (optional, default: http://localhost:8080/api/v1)
    /// - PHASEVIEW_PIPELINE (optional, default: all pipelines)
    /// - PHASEVIEW_POLL_INTERVAL (optional, seconds, default: 5)
    /// - PHASEVIEW_REQUEST_TIMEOUT (optional, seconds, default: 10)
    pub fn from_env() -> anyhow::Result<Self> {
        let engine_url = std::env::var("PHASEVIEW_ENGINE_URL")
            .unwrap_or_else(|_| DEFAULT_ENGINE_URL.to_string());

        let view = match std::env::var("PHASEVIEW_PIPELINE") {
            Ok(name) if !name.is_empty() => ViewTarget::Pipeline(name),
            _ => ViewTarget::All,
        };

        let poll_interval = match std::env::var("PHASEVIEW_POLL_INTERVAL") {
            Ok(value) => value
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| anyhow::anyhow!("PHASEVIEW_POLL_INTERVAL must be a number of seconds"))?,
            Err(_) => Duration::from_secs(5),
        };

        let request_timeout = match std::env::var("PHASEVIEW_REQUEST_TIMEOUT") {
            Ok(value) => value
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| anyhow::anyhow!("PHASEVIEW_REQUEST_TIMEOUT must be a number of seconds"))?,
            Err(_) => Duration::from_secs(10),
        };

        Ok(Self {
            engine_url,
            view,
            poll_interval,
            request_timeout,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.engine_url.is_empty() {
            anyhow::bail!("engine_url cannot be empty");
        }

        if !self.engine_url.starts_with("http://") && !self.engine_url.starts_with("https://") {
            anyhow::bail!("engine_url must start with http:// or https://");
        }

        if self.poll_interval.as_secs() == 0 {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if matches!(&self.view, ViewTarget::Pipeline(name) if name.trim().is_empty()) {
            anyhow::bail!("pipeline name cannot be blank");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE_URL.to_string(), ViewTarget::All)
    }
}

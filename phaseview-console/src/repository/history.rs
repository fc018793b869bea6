//! History repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use phaseview_client::EngineClient;
use phaseview_core::domain::state::State;

/// Repository trait for phase history reads
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Fetches the recorded states of a phase, newest first
    async fn phase_history(&self, pipeline: &str, phase: &str) -> Result<Vec<State>>;
}

/// HTTP implementation of HistoryRepository
pub struct HttpHistoryRepository {
    client: EngineClient,
}

impl HttpHistoryRepository {
    /// Creates a new HTTP history repository
    pub fn new(client: EngineClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HistoryRepository for HttpHistoryRepository {
    async fn phase_history(&self, pipeline: &str, phase: &str) -> Result<Vec<State>> {
        self.client
            .get_phase_history(pipeline, phase)
            .await
            .with_context(|| format!("Failed to fetch history of {}", phase))
    }
}

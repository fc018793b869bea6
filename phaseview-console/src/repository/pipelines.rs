//! Pipelines repository
//!
//! Reads pipeline descriptors for the live view.

use anyhow::{Context, Result};
use async_trait::async_trait;
use phaseview_client::EngineClient;
use phaseview_core::domain::pipeline::Pipeline;

/// Repository trait for pipeline reads
#[async_trait]
pub trait PipelineRepository: Send + Sync {
    /// Fetches every pipeline known to the engine
    async fn list_pipelines(&self) -> Result<Vec<Pipeline>>;

    /// Fetches a single pipeline by name
    async fn get_pipeline(&self, name: &str) -> Result<Pipeline>;
}

/// HTTP implementation of PipelineRepository
pub struct HttpPipelineRepository {
    client: EngineClient,
}

impl HttpPipelineRepository {
    /// Creates a new HTTP pipeline repository
    pub fn new(client: EngineClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PipelineRepository for HttpPipelineRepository {
    async fn list_pipelines(&self) -> Result<Vec<Pipeline>> {
        self.client
            .list_pipelines()
            .await
            .context("Failed to fetch pipelines")
    }

    async fn get_pipeline(&self, name: &str) -> Result<Pipeline> {
        self.client
            .get_pipeline(name)
            .await
            .with_context(|| format!("Failed to fetch pipeline {}", name))
    }
}

//! Actions repository
//!
//! Issues promotion and rollback commands to the engine.

use anyhow::{Context, Result};
use async_trait::async_trait;
use phaseview_client::{EngineClient, PromotionResult};
use uuid::Uuid;

/// Repository trait for state-changing commands
#[async_trait]
pub trait ActionRepository: Send + Sync {
    /// Promotes `to` along its edge from `from`
    async fn perform_edge(&self, pipeline: &str, from: &str, to: &str) -> Result<PromotionResult>;

    /// Reverts a phase to a recorded version
    async fn rollback(
        &self,
        pipeline: &str,
        phase: &str,
        version: Uuid,
    ) -> Result<PromotionResult>;
}

/// HTTP implementation of ActionRepository
pub struct HttpActionRepository {
    client: EngineClient,
}

impl HttpActionRepository {
    /// Creates a new HTTP action repository
    pub fn new(client: EngineClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ActionRepository for HttpActionRepository {
    async fn perform_edge(&self, pipeline: &str, from: &str, to: &str) -> Result<PromotionResult> {
        self.client
            .perform_edge(pipeline, from, to)
            .await
            .with_context(|| format!("Failed to promote {} from {}", to, from))
    }

    async fn rollback(
        &self,
        pipeline: &str,
        phase: &str,
        version: Uuid,
    ) -> Result<PromotionResult> {
        self.client
            .rollback_phase(pipeline, phase, version)
            .await
            .with_context(|| format!("Failed to roll back {} to {}", phase, version))
    }
}

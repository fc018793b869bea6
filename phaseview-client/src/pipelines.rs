//! System and pipeline read endpoints

use crate::EngineClient;
use crate::error::Result;
use phaseview_core::domain::pipeline::Pipeline;
use phaseview_core::domain::system::System;
use phaseview_core::dto::pipeline::PipelineList;

impl EngineClient {
    // =============================================================================
    // System
    // =============================================================================

    /// Get the system descriptor served at the API root
    pub async fn get_system(&self) -> Result<System> {
        let url = self.endpoint(&[])?;
        let response = self.client.get(url).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Pipelines
    // =============================================================================

    /// List all pipelines with their phases and edges
    ///
    /// # Example
    /// ```no_run
    /// # use phaseview_client::EngineClient;
    /// # async fn example() -> phaseview_client::Result<()> {
    /// let client = EngineClient::new("http://localhost:8080/api/v1");
    /// let pipelines = client.list_pipelines().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn list_pipelines(&self) -> Result<Vec<Pipeline>> {
        let url = self.endpoint(&["pipelines"])?;
        let response = self.client.get(url).send().await?;

        let list: PipelineList = self.handle_response(response).await?;
        tracing::debug!("Fetched {} pipeline(s)", list.pipelines.len());
        Ok(list.pipelines)
    }

    /// Get a single pipeline by name
    ///
    /// # Arguments
    /// * `pipeline` - The pipeline name
    pub async fn get_pipeline(&self, pipeline: &str) -> Result<Pipeline> {
        let url = self.endpoint(&["pipelines", pipeline])?;
        let response = self.client.get(url).send().await?;

        self.handle_response(response).await
    }
}

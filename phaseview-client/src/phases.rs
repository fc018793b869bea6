//! Phase endpoints: reads, promotion and rollback

use crate::EngineClient;
use crate::error::Result;
use phaseview_core::domain::phase::Phase;
use phaseview_core::domain::state::State;
use phaseview_core::dto::promotion::PromotionResult;
use uuid::Uuid;

impl EngineClient {
    // =============================================================================
    // Phase Reads
    // =============================================================================

    /// Get a single phase of a pipeline
    ///
    /// # Arguments
    /// * `pipeline` - The pipeline name
    /// * `phase` - The phase name
    pub async fn get_phase(&self, pipeline: &str, phase: &str) -> Result<Phase> {
        let url = self.endpoint(&["pipelines", pipeline, "phases", phase])?;
        let response = self.client.get(url).send().await?;

        self.handle_response(response).await
    }

    /// Get the recorded history of a phase
    ///
    /// # Returns
    /// States ordered newest first; index 0 is the current state. The engine
    /// may answer `null` for a phase that never recorded anything, which is
    /// returned as an empty list.
    pub async fn get_phase_history(&self, pipeline: &str, phase: &str) -> Result<Vec<State>> {
        let url = self.endpoint(&["pipelines", pipeline, "phases", phase, "history"])?;
        let response = self.client.get(url).send().await?;

        let history: Option<Vec<State>> = self.handle_optional_response(response).await?;
        Ok(history.unwrap_or_default())
    }

    // =============================================================================
    // Commands
    // =============================================================================

    /// Promote a phase from its dependency
    ///
    /// # Arguments
    /// * `pipeline` - The pipeline name
    /// * `phase` - The downstream phase to promote into
    pub async fn promote_phase(&self, pipeline: &str, phase: &str) -> Result<()> {
        let url = self.endpoint(&["pipelines", pipeline, "phases", phase, "promote"])?;
        let response = self.client.post(url).send().await?;

        self.handle_empty_response(response).await
    }

    /// Perform the promotion along the edge `from` -> `to`
    ///
    /// # Returns
    /// The engine's result annotations (e.g. a proposal URL)
    pub async fn perform_edge(
        &self,
        pipeline: &str,
        from: &str,
        to: &str,
    ) -> Result<PromotionResult> {
        let url = self.endpoint(&["pipelines", pipeline, "from", from, "to", to, "perform"])?;
        let response = self.client.post(url).send().await?;

        let result: Option<PromotionResult> = self.handle_optional_response(response).await?;
        Ok(result.unwrap_or_default())
    }

    /// Roll a phase back to a previously recorded version
    ///
    /// # Arguments
    /// * `pipeline` - The pipeline name
    /// * `phase` - The phase name
    /// * `version` - Version identifier taken from the phase history
    pub async fn rollback_phase(
        &self,
        pipeline: &str,
        phase: &str,
        version: Uuid,
    ) -> Result<PromotionResult> {
        let version = version.to_string();
        let url = self.endpoint(&["pipelines", pipeline, "phases", phase, "rollback", &version])?;
        let response = self.client.post(url).send().await?;

        let result: Option<PromotionResult> = self.handle_optional_response(response).await?;
        Ok(result.unwrap_or_default())
    }
}

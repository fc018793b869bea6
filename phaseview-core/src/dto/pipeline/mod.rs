//! Pipeline DTOs

use serde::{Deserialize, Serialize};

use crate::domain::pipeline::Pipeline;

/// Response body of `GET /pipelines`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineList {
    #[serde(default)]
    pub pipelines: Vec<Pipeline>,
}

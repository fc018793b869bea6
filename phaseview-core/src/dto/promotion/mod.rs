//! Promotion and rollback DTOs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::annotations;

/// Outcome reported by the engine for a perform or rollback call
///
/// The engine serialises an empty annotation set as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromotionResult {
    #[serde(default)]
    pub annotations: Option<HashMap<String, String>>,
}

impl PromotionResult {
    /// URL of the proposal opened instead of promoting directly, if any
    pub fn proposal_url(&self) -> Option<&str> {
        self.annotations
            .as_ref()?
            .get(annotations::GIT_PROPOSAL_URL)
            .map(String::as_str)
            .filter(|url| !url.is_empty())
    }
}

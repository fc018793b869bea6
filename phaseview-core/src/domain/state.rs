//! Phase history domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::annotations;
use super::phase::Resource;

/// One recorded snapshot of a phase's resource
///
/// History is ordered newest first; index 0 is the current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Identifier passed back to the engine to roll back to this state
    pub version: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    pub recorded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,
}

impl State {
    /// Link to the recorded commit, for git-backed phases
    pub fn commit_url(&self) -> Option<&str> {
        self.annotations
            .get(annotations::GIT_COMMIT_URL)
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_state() {
        let state: State = serde_json::from_str(
            r#"{
                "version": "0b8f2c4e-3c1d-4f1a-9d62-7f0e6c2d9a11",
                "digest": "sha256:abc",
                "recorded_at": "2024-05-01T12:00:00Z",
                "annotations": {"dev.getglu.git.commit.url": "https://github.com/acme/app/commit/1"}
            }"#,
        )
        .unwrap();

        assert_eq!(state.digest.as_deref(), Some("sha256:abc"));
        assert_eq!(
            state.commit_url(),
            Some("https://github.com/acme/app/commit/1")
        );
        assert!(state.resource.is_none());
    }
}

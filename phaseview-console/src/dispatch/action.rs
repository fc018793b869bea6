//! Actions the operator can request

use phaseview_core::domain::pipeline::PhaseRef;
use std::fmt;
use uuid::Uuid;

/// A state-changing command for the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Promote `to` to the state of its upstream `from`
    ///
    /// The endpoints may sit in different pipelines.
    Promote { from: PhaseRef, to: PhaseRef },
    /// Revert `phase` to the history entry at `index`
    Rollback {
        pipeline: String,
        phase: String,
        index: usize,
        version: Uuid,
        digest: Option<String>,
    },
}

impl Action {
    /// The phase this action changes
    pub fn key(&self) -> ActionKey {
        match self {
            Action::Promote { to, .. } => ActionKey::new(&to.pipeline, &to.name),
            Action::Rollback {
                pipeline, phase, ..
            } => ActionKey::new(pipeline, phase),
        }
    }

    /// Question shown while the action awaits confirmation
    pub fn prompt(&self) -> String {
        match self {
            Action::Promote { from, to } if from.pipeline == to.pipeline => {
                format!("Promote {} from {}?", to.name, from.name)
            }
            Action::Promote { from, to } => format!(
                "Promote {}/{} from {}/{}?",
                to.pipeline, to.name, from.pipeline, from.name
            ),
            Action::Rollback {
                phase,
                version,
                digest,
                ..
            } => format!(
                "Roll back {} to version {} ({})?",
                phase,
                version,
                digest.as_deref().unwrap_or("no digest")
            ),
        }
    }
}

/// Identity of the phase an action targets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionKey {
    pub pipeline: String,
    pub phase: String,
}

impl ActionKey {
    pub fn new(pipeline: impl Into<String>, phase: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            phase: phase.into(),
        }
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pipeline, self.phase)
    }
}

//! Pipeline domain types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::phase::Phase;

/// A named directed graph of phases
///
/// Phase names are unique within a pipeline. Dependencies are expressed
/// either by each phase's `depends_on` or by explicit `edges`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub phases: Vec<Phase>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<Edge>,
}

impl Pipeline {
    /// Creates an empty pipeline
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: HashMap::new(),
            phases: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Appends a phase
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phases.push(phase);
        self
    }

    /// Looks up a phase by name
    pub fn phase(&self, name: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.name == name)
    }

    /// All dependency edges of the pipeline, upstream first
    ///
    /// Explicit edges come first in the order the engine sent them, followed
    /// by one edge per `depends_on` that no explicit edge already covers.
    /// Endpoints are not checked against the phase set.
    pub fn dependency_edges(&self) -> Vec<Edge> {
        let mut edges = self.edges.clone();

        for phase in &self.phases {
            let Some(dependency) = phase.dependency() else {
                continue;
            };

            let from = PhaseRef::new(&self.name, dependency);
            let to = PhaseRef::new(&self.name, &phase.name);
            if edges.iter().any(|e| e.from == from && e.to == to) {
                continue;
            }

            edges.push(Edge {
                kind: None,
                from,
                to,
                can_perform: None,
            });
        }

        edges
    }
}

/// Reference to a phase, possibly in another pipeline
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhaseRef {
    pub pipeline: String,
    pub name: String,
}

impl PhaseRef {
    pub fn new(pipeline: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            name: name.into(),
        }
    }
}

/// Directed dependency edge: `from` is the upstream phase promoted into `to`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub from: PhaseRef,
    pub to: PhaseRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_perform: Option<bool>,
}

impl Edge {
    /// Whether the target already holds the source's state
    ///
    /// When both endpoint digests are known the answer is derived from them
    /// (equal digests mean a promotion would be a no-op). Otherwise the
    /// engine-supplied flag is used, defaulting to `false`.
    pub fn resolve_can_perform(&self, from: Option<&Phase>, to: Option<&Phase>) -> bool {
        match (from.and_then(Phase::digest), to.and_then(Phase::digest)) {
            (Some(source), Some(target)) => source == target,
            _ => self.can_perform.unwrap_or(false),
        }
    }
}

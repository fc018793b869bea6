//! Phase domain types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;

use super::annotations;

/// A deployable unit/environment within a pipeline
///
/// A phase's place in the dependency graph is determined by `depends_on`
/// (or by the pipeline's explicit edges).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, String>,
    #[serde(default)]
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced: Option<bool>,
}

impl Phase {
    /// Creates a phase with the given name and no dependency
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            depends_on: None,
            labels: HashMap::new(),
            annotations: HashMap::new(),
            source: Source::default(),
            resource: None,
            synced: None,
        }
    }

    /// Sets the upstream phase this phase promotes from
    pub fn with_dependency(mut self, depends_on: impl Into<String>) -> Self {
        self.depends_on = Some(depends_on.into());
        self
    }

    /// Sets the current resource digest
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        let resource = self.resource.get_or_insert_with(Resource::default);
        resource.digest = Some(digest.into());
        self
    }

    /// Sets the source kind
    pub fn with_source(mut self, kind: SourceKind) -> Self {
        self.source.kind = kind;
        self
    }

    /// The upstream phase name, if any
    ///
    /// The engine encodes "no dependency" either by omitting the field or by
    /// an empty string; both read as `None`.
    pub fn dependency(&self) -> Option<&str> {
        self.depends_on.as_deref().filter(|d| !d.is_empty())
    }

    /// Digest of the current resource, if one has been recorded
    pub fn digest(&self) -> Option<&str> {
        self.resource.as_ref().and_then(|r| r.digest.as_deref())
    }

    /// Sync status relative to the upstream phase
    ///
    /// Root phases have no sync concept and return `None`.
    pub fn is_synced(&self) -> Option<bool> {
        self.dependency().map(|_| self.synced.unwrap_or(false))
    }

    /// Image reference for OCI phases
    pub fn image_url(&self) -> Option<&str> {
        self.annotations
            .get(annotations::OCI_IMAGE_URL)
            .map(String::as_str)
    }
}

/// Where a phase sources its resource from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub config: Map<String, JsonValue>,
}

impl Source {
    /// Reads a string entry from the source configuration
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(JsonValue::as_str)
    }
}

/// Kind of source backing a phase
///
/// Unknown kinds are kept verbatim so they survive a round trip and can be
/// rendered with a generic representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceKind {
    Oci,
    Git,
    Kubernetes,
    Ci,
    Unknown(String),
}

impl Default for SourceKind {
    fn default() -> Self {
        SourceKind::Unknown(String::new())
    }
}

impl From<String> for SourceKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "oci" => SourceKind::Oci,
            "git" => SourceKind::Git,
            "kubernetes" | "k8s" => SourceKind::Kubernetes,
            "ci" => SourceKind::Ci,
            _ => SourceKind::Unknown(kind),
        }
    }
}

impl From<SourceKind> for String {
    fn from(kind: SourceKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Oci => write!(f, "oci"),
            SourceKind::Git => write!(f, "git"),
            SourceKind::Kubernetes => write!(f, "kubernetes"),
            SourceKind::Ci => write!(f, "ci"),
            SourceKind::Unknown(kind) => write!(f, "{}", kind),
        }
    }
}

/// Snapshot of a phase's current resource
///
/// Only the digest has meaning to the client; everything else is opaque.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(flatten)]
    pub data: Map<String, JsonValue>,
}

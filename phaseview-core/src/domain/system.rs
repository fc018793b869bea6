//! System descriptor

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name and labels of the engine instance, served at the API root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct System {
    pub name: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

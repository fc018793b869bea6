//! Error types for graph construction and layout

use thiserror::Error;

/// Result type alias for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;

/// Data errors detected while ranking or laying out a graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The dependency edges contain a cycle through this node
    #[error("cyclic dependency detected at node '{node}'")]
    CyclicDependency { node: String },
}

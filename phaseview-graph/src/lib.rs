//! Phaseview Graph
//!
//! Turns pipeline descriptors into a positioned, renderable graph.
//!
//! This crate provides:
//! - The graph model: typed phase/group nodes and dependency edges
//! - The builder: pipelines -> nodes and edges with stable ids
//! - Depth (rank) computation over the dependency DAG, with cycle detection
//! - The layered left-to-right layout and viewport fitting
//!
//! Everything here is pure: no I/O, no clocks, same input same output.

pub mod builder;
pub mod depth;
pub mod error;
pub mod layout;
pub mod model;

pub use builder::{IdScheme, build, build_pipeline};
pub use depth::depths;
pub use error::{GraphError, Result};
pub use layout::{LayoutOptions, Viewport, fit_view, layout};
pub use model::{
    EdgeData, Graph, GraphEdge, GraphNode, GroupNodeData, NodeData, PhaseNodeData, Position,
    Size, Topology,
};

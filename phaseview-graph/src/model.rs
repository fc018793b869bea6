//! Graph model: the view-layer projection of pipelines
//!
//! A [`Graph`] is a derived artifact. It is rebuilt from pipeline snapshots
//! and re-positioned by the layout; positions are never a source of truth.

use phaseview_core::domain::phase::Phase;
use phaseview_core::domain::pipeline::PhaseRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Top-left anchor of a node
///
/// Children of a group are positioned relative to the group's anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Translates this position by another one
    pub fn offset(self, by: Position) -> Self {
        Self::new(self.x + by.x, self.y + by.y)
    }
}

/// Width and height of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A node of the rendered graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub position: Position,
    /// Size reported by the renderer once the node has been drawn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured: Option<Size>,
    /// Extent computed by the layout for group nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Size>,
    #[serde(flatten)]
    pub data: NodeData,
}

impl GraphNode {
    pub fn is_phase(&self) -> bool {
        matches!(self.data, NodeData::Phase(_))
    }

    pub fn is_group(&self) -> bool {
        matches!(self.data, NodeData::Group(_))
    }

    /// The phase snapshot carried by a phase node
    pub fn phase(&self) -> Option<&PhaseNodeData> {
        match &self.data {
            NodeData::Phase(data) => Some(data),
            NodeData::Group(_) => None,
        }
    }

    /// Measured size, zero until the renderer has reported one
    pub fn size(&self) -> Size {
        self.measured.unwrap_or_default()
    }

    /// Size occupied on the canvas: layout bounds for groups, measured size otherwise
    pub fn extent(&self) -> Size {
        match self.data {
            NodeData::Group(_) => self.bounds.or(self.measured).unwrap_or_default(),
            NodeData::Phase(_) => self.size(),
        }
    }
}

/// Node payload, keyed by the `type` tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeData {
    Phase(PhaseNodeData),
    Group(GroupNodeData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseNodeData {
    pub pipeline: String,
    pub phase: Phase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNodeData {
    pub pipeline: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

/// A dependency edge between two phase nodes, upstream to downstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    /// Node id of the upstream (depended-upon) phase
    pub source: String,
    /// Node id of the downstream (dependent) phase
    pub target: String,
    pub data: EdgeData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub from: PhaseRef,
    pub to: PhaseRef,
    /// True when the target already holds the source's state
    pub can_perform: bool,
}

/// Nodes and edges of a rendered graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Phase nodes in input order
    pub fn phase_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(|n| n.is_phase())
    }

    /// Group nodes in input order
    pub fn group_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(|n| n.is_group())
    }

    /// Finds the node of a phase by pipeline and phase name
    pub fn find_phase(&self, pipeline: &str, phase: &str) -> Option<&GraphNode> {
        self.phase_nodes().find(|n| {
            n.phase()
                .is_some_and(|d| d.pipeline == pipeline && d.phase.name == phase)
        })
    }

    /// Edges whose target is the given node
    pub fn incoming(&self, id: &str) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(move |e| e.target == id)
    }

    /// Canvas position of a node, resolving group containment
    ///
    /// A node whose parent is missing is treated as uncontained.
    pub fn absolute_position(&self, id: &str) -> Option<Position> {
        let node = self.node(id)?;
        let parent = node
            .parent_id
            .as_deref()
            .filter(|p| *p != id)
            .and_then(|p| self.node(p));

        Some(match parent {
            Some(parent) => node.position.offset(parent.position),
            None => node.position,
        })
    }

    /// Identity of the node and edge sets, ignoring order and data
    pub fn topology(&self) -> Topology {
        Topology {
            nodes: self
                .nodes
                .iter()
                .map(|n| (n.id.clone(), n.parent_id.clone()))
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|e| (e.id.clone(), e.source.clone(), e.target.clone()))
                .collect(),
        }
    }
}

/// Structural fingerprint of a graph
///
/// Two graphs with equal topologies differ only in node/edge data, so one
/// can take the other's data without a re-layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    nodes: BTreeSet<(String, Option<String>)>,
    edges: BTreeSet<(String, String, String)>,
}

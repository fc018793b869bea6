//! Graph store
//!
//! The single owner of the rendered graph. Live sync writes pipeline data
//! through [`GraphStore::apply`], the layout writes positions through
//! [`GraphStore::layout_with`]; everything else only reads.

use phaseview_core::domain::pipeline::{PhaseRef, Pipeline};
use phaseview_graph::{
    Graph, GraphEdge, GraphError, GraphNode, LayoutOptions, Size, Topology, Viewport, build,
    fit_view, layout,
};
use tracing::{debug, info};

/// How fetched data was merged into the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    /// Same nodes and edges; only their data changed, positions kept
    Refreshed,
    /// Structure changed; the graph was replaced and needs a layout
    Rebuilt,
}

pub struct GraphStore {
    graph: Graph,
    /// Topology of the graph as built, before layout touched containment
    topology: Option<Topology>,
    options: LayoutOptions,
    needs_layout: bool,
}

impl GraphStore {
    pub fn new(options: LayoutOptions) -> Self {
        Self {
            graph: Graph::default(),
            topology: None,
            options,
            needs_layout: false,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Whether any pipeline data has been applied yet
    pub fn is_loaded(&self) -> bool {
        self.topology.is_some()
    }

    pub fn needs_layout(&self) -> bool {
        self.needs_layout
    }

    /// Drops all data, as when switching to another view
    pub fn clear(&mut self) {
        self.graph = Graph::default();
        self.topology = None;
        self.needs_layout = false;
    }

    /// Builds the graph of freshly fetched pipelines and merges it in
    pub fn apply(&mut self, pipelines: &[Pipeline]) -> Reconcile {
        self.reconcile(build(pipelines))
    }

    /// Merges a freshly built graph into the store
    ///
    /// When node ids, parents, edge ids and endpoints are unchanged, only
    /// node and edge data are copied over and the current layout stays.
    /// Otherwise the graph is replaced and marked for layout.
    pub fn reconcile(&mut self, next: Graph) -> Reconcile {
        let topology = next.topology();

        if self.topology.as_ref() == Some(&topology) {
            for node in next.nodes {
                if let Some(current) = self.graph.node_mut(&node.id) {
                    current.data = node.data;
                }
            }
            for edge in next.edges {
                if let Some(current) = self.graph.edges.iter_mut().find(|e| e.id == edge.id) {
                    current.data = edge.data;
                }
            }
            debug!("Refreshed graph data in place");
            return Reconcile::Refreshed;
        }

        info!(
            "Graph structure changed ({} nodes, {} edges)",
            next.nodes.len(),
            next.edges.len()
        );
        self.graph = next;
        self.topology = Some(topology);
        self.needs_layout = true;
        Reconcile::Rebuilt
    }

    /// Runs the two-pass layout
    ///
    /// The first pass places nodes with zero sizes; `measure` then sizes
    /// every node at its placeholder position, and the second pass with
    /// those sizes is kept. On a cycle the graph keeps its current
    /// positions and the error is returned.
    pub fn layout_with(
        &mut self,
        measure: impl Fn(&GraphNode) -> Size,
    ) -> Result<(), GraphError> {
        self.needs_layout = false;

        let mut first = self.graph.clone();
        for node in &mut first.nodes {
            node.measured = None;
        }
        let mut first = layout(&first, &self.options)?;

        for node in &mut first.nodes {
            if node.is_phase() {
                node.measured = Some(measure(node));
            }
        }

        self.graph = layout(&first, &self.options)?;
        debug!("Layout settled for {} nodes", self.graph.nodes.len());
        Ok(())
    }

    /// Re-sizes phase nodes after an in-place refresh
    ///
    /// Refreshed data can change how much a node shows. When any measured
    /// size differs, the graph is laid out again with the new sizes and
    /// `true` is returned. On a cycle the current positions are kept.
    pub fn remeasure(
        &mut self,
        measure: impl Fn(&GraphNode) -> Size,
    ) -> Result<bool, GraphError> {
        let mut next = self.graph.clone();
        let mut changed = false;
        for node in next.nodes.iter_mut().filter(|n| n.is_phase()) {
            let size = measure(node);
            if node.measured != Some(size) {
                node.measured = Some(size);
                changed = true;
            }
        }

        if !changed {
            return Ok(false);
        }

        self.graph = layout(&next, &self.options)?;
        debug!("Re-laid out after node sizes changed");
        Ok(true)
    }

    /// Bounding box of the laid out graph
    pub fn viewport(&self) -> Option<Viewport> {
        fit_view(&self.graph)
    }

    /// Resolves an operator-supplied phase reference to a phase node
    ///
    /// Accepts a node id, `pipeline/phase`, or a bare phase name when it is
    /// unique across the view.
    pub fn resolve_phase(&self, reference: &str) -> Option<&GraphNode> {
        if let Some(node) = self.graph.node(reference).filter(|n| n.is_phase()) {
            return Some(node);
        }

        if let Some((pipeline, phase)) = reference.split_once('/') {
            return self.graph.find_phase(pipeline, phase);
        }

        let mut matches = self.graph.phase_nodes().filter(|n| {
            n.phase()
                .is_some_and(|data| data.phase.name == reference)
        });
        match (matches.next(), matches.next()) {
            (Some(node), None) => Some(node),
            _ => None,
        }
    }

    /// The edge from one phase node to another
    pub fn edge_between(&self, source: &str, target: &str) -> Option<&GraphEdge> {
        self.graph
            .edges
            .iter()
            .find(|e| e.source == source && e.target == target)
    }

    /// The edge that promotes into `to` from `from`
    pub fn promotion_edge(&self, from: &PhaseRef, to: &PhaseRef) -> Option<&GraphEdge> {
        self.graph
            .edges
            .iter()
            .find(|e| &e.data.from == from && &e.data.to == to)
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(LayoutOptions::compact())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phaseview_core::domain::phase::Phase;
    use phaseview_core::domain::pipeline::Edge;
    use phaseview_graph::Position;

    fn payments(b_digest: &str) -> Vec<Pipeline> {
        vec![
            Pipeline::new("payments")
                .with_phase(Phase::new("A").with_digest("sha256:1"))
                .with_phase(Phase::new("B").with_dependency("A").with_digest(b_digest)),
        ]
    }

    fn fixed_size(_: &GraphNode) -> Size {
        Size::new(10.0, 4.0)
    }

    #[test]
    fn test_first_apply_rebuilds() {
        let mut store = GraphStore::default();
        assert!(!store.is_loaded());

        assert_eq!(store.apply(&payments("sha256:0")), Reconcile::Rebuilt);
        assert!(store.needs_layout());
        assert!(store.is_loaded());
    }

    #[test]
    fn test_data_change_keeps_positions() {
        let mut store = GraphStore::default();
        store.apply(&payments("sha256:0"));
        store.layout_with(fixed_size).unwrap();
        let before = store.graph().node("B").unwrap().position;

        assert_eq!(store.apply(&payments("sha256:1")), Reconcile::Refreshed);
        assert!(!store.needs_layout());

        let b = store.graph().node("B").unwrap();
        assert_eq!(b.position, before);
        assert_eq!(b.measured, Some(Size::new(10.0, 4.0)));
        assert_eq!(b.phase().unwrap().phase.digest(), Some("sha256:1"));
        assert!(store.graph().edge("edge-A-B").unwrap().data.can_perform);
    }

    #[test]
    fn test_structure_change_rebuilds() {
        let mut store = GraphStore::default();
        store.apply(&payments("sha256:0"));
        store.layout_with(fixed_size).unwrap();

        let mut grown = payments("sha256:0");
        grown[0].phases.push(Phase::new("C").with_dependency("B"));

        assert_eq!(store.apply(&grown), Reconcile::Rebuilt);
        assert!(store.needs_layout());
        assert_eq!(store.graph().node("C").unwrap().position, Position::default());
    }

    #[test]
    fn test_two_pass_layout_uses_measured_sizes() {
        let mut store = GraphStore::new(LayoutOptions::default());
        store.apply(&payments("sha256:0"));
        store
            .layout_with(|node| {
                if node.id == "A" {
                    Size::new(50.0, 4.0)
                } else {
                    Size::new(10.0, 4.0)
                }
            })
            .unwrap();

        // Column 1 starts after A's measured width plus the rank gap
        let b = store.graph().node("B").unwrap();
        assert_eq!(b.position.x, 20.0 + 50.0 + 100.0);
        assert!(!store.needs_layout());
    }

    #[test]
    fn test_remeasure_relays_grown_nodes() {
        let mut store = GraphStore::new(LayoutOptions::default());
        store.apply(&payments("sha256:0"));
        store.layout_with(fixed_size).unwrap();
        let before = store.graph().node("B").unwrap().position;

        assert_eq!(store.apply(&payments("sha256:1")), Reconcile::Refreshed);
        assert!(!store.remeasure(fixed_size).unwrap());
        assert_eq!(store.graph().node("B").unwrap().position, before);

        let grown = |node: &GraphNode| {
            if node.id == "A" {
                Size::new(50.0, 4.0)
            } else {
                Size::new(10.0, 4.0)
            }
        };
        assert!(store.remeasure(grown).unwrap());

        assert_eq!(store.graph().node("A").unwrap().measured, Some(Size::new(50.0, 4.0)));
        let b = store.graph().node("B").unwrap();
        assert_eq!(b.position.x, 20.0 + 50.0 + 100.0);
        assert_ne!(b.position, before);
    }

    #[test]
    fn test_cyclic_data_reports_error() {
        let mut store = GraphStore::default();
        store.apply(&[Pipeline::new("p")
            .with_phase(Phase::new("x").with_dependency("y"))
            .with_phase(Phase::new("y").with_dependency("x"))]);

        assert!(store.layout_with(fixed_size).is_err());
        assert!(!store.needs_layout());
    }

    #[test]
    fn test_resolve_phase() {
        let mut store = GraphStore::default();
        let mut pipelines = payments("sha256:0");
        pipelines.push(Pipeline::new("checkout").with_phase(Phase::new("A")).with_phase(Phase::new("Z")));
        store.apply(&pipelines);

        assert_eq!(store.resolve_phase("payments-A").unwrap().id, "payments-A");
        assert_eq!(store.resolve_phase("checkout/A").unwrap().id, "checkout-A");
        assert_eq!(store.resolve_phase("Z").unwrap().id, "checkout-Z");
        // Ambiguous across pipelines
        assert!(store.resolve_phase("A").is_none());
        // Groups are not phases
        assert!(store.resolve_phase("payments").is_none());
    }

    #[test]
    fn test_promotion_edge_lookup() {
        let mut store = GraphStore::default();
        store.apply(&payments("sha256:0"));

        let a = PhaseRef::new("payments", "A");
        let b = PhaseRef::new("payments", "B");
        assert!(store.promotion_edge(&a, &b).is_some());
        assert!(store.promotion_edge(&b, &a).is_none());
        assert_eq!(store.edge_between("A", "B").unwrap().id, "edge-A-B");
    }

    #[test]
    fn test_promotion_edge_matches_target_pipeline() {
        let mut store = GraphStore::default();
        let mut pipelines = payments("sha256:0");
        let mut checkout = Pipeline::new("checkout").with_phase(Phase::new("B"));
        checkout.edges.push(Edge {
            kind: None,
            from: PhaseRef::new("payments", "A"),
            to: PhaseRef::new("checkout", "B"),
            can_perform: None,
        });
        pipelines.push(checkout);
        store.apply(&pipelines);

        let a = PhaseRef::new("payments", "A");
        let local = store.promotion_edge(&a, &PhaseRef::new("payments", "B")).unwrap();
        let cross = store.promotion_edge(&a, &PhaseRef::new("checkout", "B")).unwrap();
        assert_eq!(local.target, "payments-B");
        assert_eq!(cross.target, "checkout-B");
        assert!(store.promotion_edge(&a, &PhaseRef::new("billing", "B")).is_none());
    }
}

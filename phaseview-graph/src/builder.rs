//! Graph builder: pipeline descriptors to nodes and edges
//!
//! Ids are derived from names only, so rebuilding from the same input
//! always yields the same ids in the same order.

use phaseview_core::domain::phase::Phase;
use phaseview_core::domain::pipeline::{Edge, PhaseRef, Pipeline};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::model::{
    EdgeData, Graph, GraphEdge, GraphNode, GroupNodeData, NodeData, PhaseNodeData, Position,
};

/// How node and edge ids are derived from names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdScheme {
    /// `{phase}` and `edge-{from}-{to}`
    Plain,
    /// `{pipeline}-{phase}` and `edge-{pipeline}-{from}-{to}`
    Qualified,
}

impl IdScheme {
    /// Picks the scheme for a set of pipelines
    ///
    /// Plain ids are only safe for a single pipeline whose phase names do not
    /// shadow the pipeline's own group id.
    pub fn for_pipelines(pipelines: &[Pipeline]) -> Self {
        match pipelines {
            [pipeline] if pipeline.phase(&pipeline.name).is_none() => IdScheme::Plain,
            _ => IdScheme::Qualified,
        }
    }

    pub fn node_id(self, phase: &PhaseRef) -> String {
        match self {
            IdScheme::Plain => phase.name.clone(),
            IdScheme::Qualified => format!("{}-{}", phase.pipeline, phase.name),
        }
    }

    pub fn edge_id(self, from: &PhaseRef, to: &PhaseRef) -> String {
        match self {
            IdScheme::Plain => format!("edge-{}-{}", from.name, to.name),
            IdScheme::Qualified if from.pipeline == to.pipeline => {
                format!("edge-{}-{}-{}", from.pipeline, from.name, to.name)
            }
            IdScheme::Qualified => format!(
                "edge-{}-{}-{}-{}",
                from.pipeline, from.name, to.pipeline, to.name
            ),
        }
    }
}

/// Builds the graph of a single pipeline
pub fn build_pipeline(pipeline: &Pipeline) -> Graph {
    build(std::slice::from_ref(pipeline))
}

/// Builds one graph from several pipelines
///
/// Emits a group node per pipeline followed by its phase nodes, then one
/// edge per resolvable dependency, pointing upstream to downstream.
/// Dependencies on phases that are not in scope are dropped and the
/// dependent phase is rendered as a root.
///
/// Group ids are the pipeline names and are claimed first. A phase or edge
/// id that would clash with an id already claimed gets a `~N` suffix, in
/// input order.
pub fn build(pipelines: &[Pipeline]) -> Graph {
    let scheme = IdScheme::for_pipelines(pipelines);
    let mut graph = Graph::default();

    // Pipelines in scope, first occurrence wins
    let mut unique: Vec<&Pipeline> = Vec::new();
    for pipeline in pipelines {
        if unique.iter().any(|p| p.name == pipeline.name) {
            warn!("Duplicate pipeline {} ignored", pipeline.name);
        } else {
            unique.push(pipeline);
        }
    }

    let mut node_ids = IdAllocator::default();
    for pipeline in &unique {
        node_ids.claim(pipeline.name.clone());
    }

    // Phases in scope with their node ids, first occurrence wins
    let mut in_scope: HashMap<PhaseRef, (String, &Phase)> = HashMap::new();

    for pipeline in &unique {
        graph.nodes.push(GraphNode {
            id: pipeline.name.clone(),
            parent_id: None,
            position: Position::default(),
            measured: None,
            bounds: None,
            data: NodeData::Group(GroupNodeData {
                pipeline: pipeline.name.clone(),
                labels: pipeline.labels.clone(),
            }),
        });

        for phase in &pipeline.phases {
            let phase_ref = PhaseRef::new(&pipeline.name, &phase.name);
            if in_scope.contains_key(&phase_ref) {
                warn!(
                    "Duplicate phase {} in pipeline {} ignored",
                    phase.name, pipeline.name
                );
                continue;
            }

            let id = node_ids.claim(scheme.node_id(&phase_ref));
            graph.nodes.push(GraphNode {
                id: id.clone(),
                parent_id: Some(pipeline.name.clone()),
                position: Position::default(),
                measured: None,
                bounds: None,
                data: NodeData::Phase(PhaseNodeData {
                    pipeline: pipeline.name.clone(),
                    phase: phase.clone(),
                }),
            });
            in_scope.insert(phase_ref, (id, phase));
        }
    }

    let mut edge_ids = IdAllocator::default();
    let mut seen = HashSet::new();
    for pipeline in &unique {
        for edge in pipeline.dependency_edges() {
            let (Some(from), Some(to)) = (in_scope.get(&edge.from), in_scope.get(&edge.to))
            else {
                debug!(
                    "Skipping dangling dependency {}/{} -> {}/{}",
                    edge.from.pipeline, edge.from.name, edge.to.pipeline, edge.to.name
                );
                continue;
            };

            if !seen.insert((edge.from.clone(), edge.to.clone())) {
                continue;
            }

            let id = edge_ids.claim(scheme.edge_id(&edge.from, &edge.to));
            graph.edges.push(graph_edge(id, &edge, from, to));
        }
    }

    debug!(
        "Built graph with {} nodes and {} edges",
        graph.nodes.len(),
        graph.edges.len()
    );

    graph
}

/// Hands out unique ids, suffixing a taken one with `~2`, `~3`, ...
#[derive(Default)]
struct IdAllocator {
    taken: HashSet<String>,
}

impl IdAllocator {
    fn claim(&mut self, base: String) -> String {
        if !self.taken.contains(&base) {
            self.taken.insert(base.clone());
            return base;
        }

        let mut n = 2;
        loop {
            let id = format!("{}~{}", base, n);
            if self.taken.insert(id.clone()) {
                debug!("Id {} is taken, using {}", base, id);
                return id;
            }
            n += 1;
        }
    }
}

fn graph_edge(
    id: String,
    edge: &Edge,
    (source, from): &(String, &Phase),
    (target, to): &(String, &Phase),
) -> GraphEdge {
    GraphEdge {
        id,
        source: source.clone(),
        target: target.clone(),
        data: EdgeData {
            kind: edge.kind.clone(),
            from: edge.from.clone(),
            to: edge.to.clone(),
            can_perform: edge.resolve_can_perform(Some(*from), Some(*to)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payments() -> Pipeline {
        Pipeline::new("payments")
            .with_phase(Phase::new("A").with_digest("sha256:2"))
            .with_phase(Phase::new("B").with_dependency("A").with_digest("sha256:1"))
            .with_phase(Phase::new("C").with_dependency("B").with_digest("sha256:1"))
    }

    fn ids(graph: &Graph) -> Vec<&str> {
        graph.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    fn edge_ids(graph: &Graph) -> Vec<&str> {
        graph.edges.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_build_single_pipeline() {
        let graph = build_pipeline(&payments());

        assert_eq!(ids(&graph), vec!["payments", "A", "B", "C"]);
        assert_eq!(graph.phase_nodes().count(), 3);
        assert_eq!(graph.group_nodes().count(), 1);
        assert_eq!(edge_ids(&graph), vec!["edge-A-B", "edge-B-C"]);

        let ab = graph.edge("edge-A-B").unwrap();
        assert_eq!(ab.source, "A");
        assert_eq!(ab.target, "B");

        for node in graph.phase_nodes() {
            assert_eq!(node.parent_id.as_deref(), Some("payments"));
        }
    }

    #[test]
    fn test_can_perform_from_digests() {
        let graph = build_pipeline(&payments());

        assert!(!graph.edge("edge-A-B").unwrap().data.can_perform);
        assert!(graph.edge("edge-B-C").unwrap().data.can_perform);
    }

    #[test]
    fn test_dangling_dependency_is_root() {
        let pipeline = payments().with_phase(Phase::new("D").with_dependency("missing"));
        let graph = build_pipeline(&pipeline);

        assert!(graph.node("D").is_some());
        assert_eq!(graph.incoming("D").count(), 0);
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn test_build_is_idempotent() {
        let pipeline = payments();
        assert_eq!(build_pipeline(&pipeline), build_pipeline(&pipeline));
    }

    #[test]
    fn test_multiple_pipelines_use_qualified_ids() {
        let checkout = Pipeline::new("checkout")
            .with_phase(Phase::new("A"))
            .with_phase(Phase::new("B").with_dependency("A"));
        let graph = build(&[payments(), checkout]);

        assert_eq!(
            ids(&graph),
            vec![
                "payments",
                "payments-A",
                "payments-B",
                "payments-C",
                "checkout",
                "checkout-A",
                "checkout-B"
            ]
        );
        assert_eq!(
            edge_ids(&graph),
            vec!["edge-payments-A-B", "edge-payments-B-C", "edge-checkout-A-B"]
        );
        assert_eq!(graph.edge("edge-checkout-A-B").unwrap().source, "checkout-A");
    }

    #[test]
    fn test_cross_pipeline_edge() {
        let mut checkout = Pipeline::new("checkout").with_phase(Phase::new("staging"));
        checkout.edges.push(Edge {
            kind: Some("promotion".to_string()),
            from: PhaseRef::new("payments", "C"),
            to: PhaseRef::new("checkout", "staging"),
            can_perform: None,
        });

        let graph = build(&[payments(), checkout.clone()]);
        let edge = graph.edge("edge-payments-C-checkout-staging").unwrap();
        assert_eq!(edge.source, "payments-C");
        assert_eq!(edge.target, "checkout-staging");
        assert_eq!(edge.data.kind.as_deref(), Some("promotion"));

        // Out of scope when built alone
        let alone = build_pipeline(&checkout);
        assert!(alone.edges.is_empty());
    }

    #[test]
    fn test_phase_named_like_pipeline_is_qualified() {
        let pipeline = Pipeline::new("app")
            .with_phase(Phase::new("app"))
            .with_phase(Phase::new("prod").with_dependency("app"));
        let graph = build_pipeline(&pipeline);

        assert_eq!(ids(&graph), vec!["app", "app-app", "app-prod"]);
        assert_eq!(edge_ids(&graph), vec!["edge-app-app-prod"]);
    }

    #[test]
    fn test_duplicate_edges_emitted_once() {
        let mut pipeline = payments();
        for _ in 0..2 {
            pipeline.edges.push(Edge {
                kind: None,
                from: PhaseRef::new("payments", "A"),
                to: PhaseRef::new("payments", "C"),
                can_perform: None,
            });
        }

        let graph = build_pipeline(&pipeline);
        assert_eq!(edge_ids(&graph), vec!["edge-A-C", "edge-A-B", "edge-B-C"]);
    }

    #[test]
    fn test_duplicate_phase_keeps_first() {
        let pipeline = payments().with_phase(Phase::new("A").with_digest("sha256:9"));
        let graph = build_pipeline(&pipeline);

        assert_eq!(graph.phase_nodes().count(), 3);
        let a = graph.node("A").and_then(GraphNode::phase).unwrap();
        assert_eq!(a.phase.digest(), Some("sha256:2"));
    }

    #[test]
    fn test_phase_id_never_shadows_a_pipeline() {
        let payments = Pipeline::new("payments").with_phase(Phase::new("api"));
        let payments_api = Pipeline::new("payments-api").with_phase(Phase::new("x"));
        let graph = build(&[payments, payments_api]);

        assert_eq!(
            ids(&graph),
            vec!["payments", "payments-api~2", "payments-api", "payments-api-x"]
        );
        assert_eq!(graph.group_nodes().count(), 2);
        assert!(graph.node("payments-api").unwrap().is_group());
        assert_eq!(graph.find_phase("payments", "api").unwrap().id, "payments-api~2");
        assert_eq!(
            graph.find_phase("payments-api", "x").unwrap().parent_id.as_deref(),
            Some("payments-api")
        );
    }

    #[test]
    fn test_duplicate_pipeline_keeps_first() {
        let graph = build(&[payments(), Pipeline::new("payments"), Pipeline::new("checkout")]);

        assert_eq!(graph.group_nodes().count(), 2);
        assert_eq!(graph.phase_nodes().count(), 3);
    }

    #[test]
    fn test_clashing_edge_ids_keep_both_edges() {
        // "a"/"b-c" -> "d" and "a-b"/"c" -> "d" both read edge-a-b-c-d; the
        // phase ids clash the same way
        let mut a = Pipeline::new("a")
            .with_phase(Phase::new("b-c"))
            .with_phase(Phase::new("d"));
        a.edges.push(Edge {
            kind: None,
            from: PhaseRef::new("a", "b-c"),
            to: PhaseRef::new("a", "d"),
            can_perform: None,
        });
        let ab = Pipeline::new("a-b")
            .with_phase(Phase::new("c"))
            .with_phase(Phase::new("d").with_dependency("c"));

        let graph = build(&[a, ab]);
        assert_eq!(edge_ids(&graph), vec!["edge-a-b-c-d", "edge-a-b-c-d~2"]);
        assert_eq!(graph.edge("edge-a-b-c-d").unwrap().source, "a-b-c");
        assert_eq!(graph.edge("edge-a-b-c-d~2").unwrap().source, "a-b-c~2");
    }
}

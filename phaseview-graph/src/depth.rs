//! Rank computation over the dependency DAG

use std::collections::{HashMap, VecDeque};

use crate::error::{GraphError, Result};
use crate::model::Graph;

/// Depth of every phase node: the longest hop count from a root
///
/// Roots (no incoming edge) have depth 0. Edges touching a non-phase or
/// unknown node are ignored. Each node is settled exactly once, so the walk
/// terminates after at most N steps for N phase nodes; nodes left unsettled
/// sit on a cycle and are reported as [`GraphError::CyclicDependency`].
pub fn depths(graph: &Graph) -> Result<HashMap<String, usize>> {
    let ids: Vec<&str> = graph.phase_nodes().map(|n| n.id.as_str()).collect();
    let index: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    let mut downstream: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];
    let mut pending = vec![0usize; ids.len()];

    for edge in &graph.edges {
        let (Some(&from), Some(&to)) = (
            index.get(edge.source.as_str()),
            index.get(edge.target.as_str()),
        ) else {
            continue;
        };
        downstream[from].push(to);
        pending[to] += 1;
    }

    let mut depth = vec![0usize; ids.len()];
    let mut ready: VecDeque<usize> = (0..ids.len()).filter(|&i| pending[i] == 0).collect();
    let mut settled = 0;

    while let Some(node) = ready.pop_front() {
        settled += 1;
        for &next in &downstream[node] {
            depth[next] = depth[next].max(depth[node] + 1);
            pending[next] -= 1;
            if pending[next] == 0 {
                ready.push_back(next);
            }
        }
    }

    if settled < ids.len() {
        let node = (0..ids.len())
            .find(|&i| pending[i] > 0)
            .map(|i| ids[i].to_string())
            .unwrap_or_default();
        return Err(GraphError::CyclicDependency { node });
    }

    Ok(ids
        .into_iter()
        .zip(depth)
        .map(|(id, d)| (id.to_string(), d))
        .collect())
}

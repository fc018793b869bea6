//! Layered left-to-right layout
//!
//! Every pipeline is laid out as its own lane: phase nodes are placed in
//! columns by depth, stacked in input order within a column, and the lane is
//! wrapped by its group node. Lanes are stacked top to bottom.
//!
//! Sizes come from [`GraphNode::measured`] and default to zero, so the layout
//! can run before anything has been drawn and again once real sizes are
//! known; the second run is the one the view settles on.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::depth::depths;
use crate::error::Result;
use crate::model::{Graph, Position, Size};

/// Spacing constants of the layout
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    /// Vertical gap between nodes stacked in one column
    pub node_sep: f64,
    /// Horizontal gap between columns
    pub rank_sep: f64,
    /// Outer margin of the canvas
    pub margin: f64,
    /// Vertical gap between stacked pipelines
    pub pipeline_spacing: f64,
    /// Inner padding of a group around its phases
    pub group_padding: f64,
    /// Extra space reserved on top of a group for its title
    pub group_header: f64,
    /// Lower bound for the height of a row slot
    pub min_slot_height: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            node_sep: 10.0,
            rank_sep: 100.0,
            margin: 10.0,
            pipeline_spacing: 100.0,
            group_padding: 20.0,
            group_header: 0.0,
            min_slot_height: 0.0,
        }
    }
}

impl LayoutOptions {
    /// Preset for character-cell canvases
    pub fn compact() -> Self {
        Self {
            node_sep: 1.0,
            rank_sep: 6.0,
            margin: 0.0,
            pipeline_spacing: 1.0,
            group_padding: 2.0,
            group_header: 1.0,
            min_slot_height: 0.0,
        }
    }
}

/// Visible rectangle that covers the whole graph
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Assigns positions to every node of the graph
///
/// Returns a copy of the graph; node and edge order, ids and data are
/// unchanged. Phase nodes whose parent is not a group of this graph are
/// placed in a lane below all groups and lose their containment.
pub fn layout(graph: &Graph, options: &LayoutOptions) -> Result<Graph> {
    let depths = depths(graph)?;
    let mut out = graph.clone();

    let groups: Vec<String> = graph.group_nodes().map(|n| n.id.clone()).collect();

    let mut lanes: Vec<Vec<usize>> = vec![Vec::new(); groups.len()];
    let mut ungrouped: Vec<usize> = Vec::new();

    for (i, node) in graph.nodes.iter().enumerate() {
        if !node.is_phase() {
            continue;
        }
        let lane = node
            .parent_id
            .as_deref()
            .and_then(|parent| groups.iter().position(|g| g == parent));
        match lane {
            Some(lane) => lanes[lane].push(i),
            None => ungrouped.push(i),
        }
    }

    let mut cursor_y = options.margin;

    for (group_id, members) in groups.iter().zip(&lanes) {
        let (local, content) = place_lane(graph, members, &depths, options);

        let inset = Position::new(
            options.group_padding,
            options.group_padding + options.group_header,
        );
        for (index, position) in local {
            out.nodes[index].position = position.offset(inset);
        }

        let bounds = Size::new(
            content.width + 2.0 * options.group_padding,
            content.height + 2.0 * options.group_padding + options.group_header,
        );
        if let Some(group) = out.node_mut(group_id) {
            group.position = Position::new(options.margin, cursor_y);
            group.bounds = Some(bounds);
        }

        cursor_y += bounds.height + options.pipeline_spacing;
    }

    if !ungrouped.is_empty() {
        debug!("{} phase nodes laid out without a group", ungrouped.len());

        let (local, _) = place_lane(graph, &ungrouped, &depths, options);
        let origin = Position::new(options.margin, cursor_y);
        for (index, position) in local {
            let node = &mut out.nodes[index];
            node.parent_id = None;
            node.position = position.offset(origin);
        }
    }

    Ok(out)
}

/// Places one lane of phase nodes relative to the lane's origin
///
/// Returns the top-left anchor of each member (by node index) and the size
/// of the lane's content.
fn place_lane(
    graph: &Graph,
    members: &[usize],
    depths: &HashMap<String, usize>,
    options: &LayoutOptions,
) -> (Vec<(usize, Position)>, Size) {
    // Members per column, in input order
    let mut columns: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for &index in members {
        let depth = depths.get(&graph.nodes[index].id).copied().unwrap_or(0);
        columns.entry(depth).or_default().push(index);
    }

    let mut placed = Vec::with_capacity(members.len());
    let mut content = Size::default();
    let mut column_x = 0.0;

    for column in columns.values() {
        let sizes: Vec<Size> = column.iter().map(|&i| graph.nodes[i].size()).collect();
        let width = sizes.iter().map(|s| s.width).fold(0.0, f64::max);
        let tallest = sizes.iter().map(|s| s.height).fold(0.0, f64::max);
        let slot = options.min_slot_height.max(tallest + options.node_sep);

        for (row, (&index, size)) in column.iter().zip(&sizes).enumerate() {
            let center = Position::new(column_x + width / 2.0, row as f64 * slot + tallest / 2.0);
            placed.push((index, anchor(center, *size)));
        }

        let height = (column.len() - 1) as f64 * slot + tallest;
        content.width = column_x + width;
        content.height = content.height.max(height);
        column_x += width + options.rank_sep;
    }

    (placed, content)
}

/// Translates a center point to the top-left anchor of a box
fn anchor(center: Position, size: Size) -> Position {
    Position::new(center.x - size.width / 2.0, center.y - size.height / 2.0)
}

/// Bounding box of all nodes in canvas coordinates
///
/// Returns `None` for an empty graph.
pub fn fit_view(graph: &Graph) -> Option<Viewport> {
    let mut bounds: Option<(f64, f64, f64, f64)> = None;

    for node in &graph.nodes {
        let Some(position) = graph.absolute_position(&node.id) else {
            continue;
        };
        let extent = node.extent();
        let (x1, y1) = (position.x + extent.width, position.y + extent.height);

        bounds = Some(match bounds {
            None => (position.x, position.y, x1, y1),
            Some((min_x, min_y, max_x, max_y)) => (
                min_x.min(position.x),
                min_y.min(position.y),
                max_x.max(x1),
                max_y.max(y1),
            ),
        });
    }

    bounds.map(|(min_x, min_y, max_x, max_y)| Viewport {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    })
}

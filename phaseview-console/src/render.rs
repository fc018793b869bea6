//! Terminal renderer
//!
//! Draws the laid out graph onto a character canvas. One layout unit is one
//! terminal cell; phase boxes are sized from their rendered lines, which is
//! what the second layout pass uses as measured sizes.

use phaseview_core::domain::phase::{Source, SourceKind};
use phaseview_graph::{Graph, GraphEdge, GraphNode, NodeData, PhaseNodeData, Position, Size};
use std::collections::HashSet;

/// Narrowest text area of a phase box
const MIN_INNER_WIDTH: usize = 10;
/// Border and one space of padding on each side
const BOX_CHROME: usize = 4;
const MAX_LABELS: usize = 3;
const SHORT_DIGEST_LEN: usize = 19;
const MAX_IMAGE_LEN: usize = 32;

/// Icon shown next to a phase name, by source kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Container,
    Package,
    Github,
    Gitlab,
    GitBranch,
    Hexagon,
}

impl Icon {
    pub fn name(self) -> &'static str {
        match self {
            Icon::Container => "container",
            Icon::Package => "package",
            Icon::Github => "github",
            Icon::Gitlab => "gitlab",
            Icon::GitBranch => "git-branch",
            Icon::Hexagon => "hexagon",
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Icon::Container => '▣',
            Icon::Package => '▤',
            Icon::Github => '●',
            Icon::Gitlab => '◆',
            Icon::GitBranch => '⑂',
            Icon::Hexagon => '⬡',
        }
    }
}

/// Picks the icon for a phase source; unknown kinds get the generic hexagon
pub fn source_icon(source: &Source) -> Icon {
    match &source.kind {
        SourceKind::Kubernetes => Icon::Container,
        SourceKind::Oci => Icon::Package,
        SourceKind::Ci => match source.config_str("scm") {
            Some("github") => Icon::Github,
            Some("gitlab") => Icon::Gitlab,
            _ => Icon::GitBranch,
        },
        SourceKind::Git => Icon::GitBranch,
        SourceKind::Unknown(_) => Icon::Hexagon,
    }
}

/// Text lines of a phase box, top to bottom
pub fn phase_lines(data: &PhaseNodeData) -> Vec<String> {
    let phase = &data.phase;
    let mut lines = vec![format!("{} {}", source_icon(&phase.source).glyph(), phase.name)];

    if let Some(image) = phase.image_url() {
        lines.push(format!("image: {}", truncate(image, MAX_IMAGE_LEN)));
    }

    if let Some(digest) = phase.digest() {
        lines.push(truncate(digest, SHORT_DIGEST_LEN));
    }

    let mut labels: Vec<_> = phase.labels.iter().collect();
    labels.sort();
    for (key, value) in labels.into_iter().take(MAX_LABELS) {
        lines.push(format!("{}={}", key, value));
    }

    match phase.is_synced() {
        Some(true) => lines.push("synced".to_string()),
        Some(false) => lines.push("out of sync".to_string()),
        None => {}
    }

    lines
}

/// Size of a node as drawn
///
/// Phase boxes fit their lines; groups fit their title, their real extent
/// comes from the layout.
pub fn measure(node: &GraphNode) -> Size {
    match &node.data {
        NodeData::Phase(data) => {
            let lines = phase_lines(data);
            let inner = lines
                .iter()
                .map(|l| l.chars().count())
                .max()
                .unwrap_or(0)
                .max(MIN_INNER_WIDTH);
            Size::new((inner + BOX_CHROME) as f64, (lines.len() + 2) as f64)
        }
        NodeData::Group(data) => Size::new((data.pipeline.chars().count() + BOX_CHROME) as f64, 2.0),
    }
}

/// Per-frame state the renderer needs besides the graph
#[derive(Debug, Default)]
pub struct RenderState {
    /// Node drawn with a heavy border
    pub selected: Option<String>,
    /// Edges whose promotion is awaiting confirmation or the engine
    pub pending: HashSet<String>,
}

/// Status glyph drawn on an edge
pub fn edge_glyph(edge: &GraphEdge, state: &RenderState) -> char {
    if state.pending.contains(&edge.id) {
        '…'
    } else if edge.data.can_perform {
        '✓'
    } else {
        '↑'
    }
}

/// Draws the whole graph, cropped to its bounding box
pub fn render(graph: &Graph, state: &RenderState) -> String {
    let Some(view) = phaseview_graph::fit_view(graph) else {
        return String::new();
    };

    let origin = (view.x.floor() as i64, view.y.floor() as i64);
    let width = ((view.x + view.width).ceil() as i64 - origin.0).max(0) as usize;
    let height = ((view.y + view.height).ceil() as i64 - origin.1).max(0) as usize;
    let mut canvas = Canvas::new(origin, width, height);

    for node in graph.group_nodes() {
        if let (Some(rect), NodeData::Group(data)) = (Rect::of(graph, node), &node.data) {
            canvas.frame(rect, Border::Rounded);
            canvas.text(rect.x + 2, rect.y, &format!(" {} ", data.pipeline), rect.w - 3);
        }
    }

    for edge in &graph.edges {
        let source = graph.node(&edge.source).and_then(|n| Rect::of(graph, n));
        let target = graph.node(&edge.target).and_then(|n| Rect::of(graph, n));
        if let (Some(source), Some(target)) = (source, target) {
            canvas.edge(source, target, edge_glyph(edge, state));
        }
    }

    for node in graph.phase_nodes() {
        let (Some(rect), NodeData::Phase(data)) = (Rect::of(graph, node), &node.data) else {
            continue;
        };
        let border = if state.selected.as_deref() == Some(node.id.as_str()) {
            Border::Heavy
        } else {
            Border::Light
        };

        canvas.fill(rect);
        canvas.frame(rect, border);
        for (i, line) in phase_lines(data).iter().enumerate() {
            let row = rect.y + 1 + i as i64;
            if row >= rect.y + rect.h - 1 {
                break;
            }
            canvas.text(rect.x + 2, row, line, rect.w - BOX_CHROME as i64);
        }
    }

    canvas.into_string()
}

/// Detail panel for the selected phase
///
/// A collapsed panel shows its title line only.
pub fn render_panel(graph: &Graph, selected: Option<&str>, expanded: bool) -> String {
    if !expanded {
        return "▸ Details".to_string();
    }

    let mut out = vec!["▾ Details".to_string()];
    let Some(data) = selected.and_then(|id| graph.node(id)).and_then(GraphNode::phase) else {
        out.push("  No phase selected".to_string());
        return out.join("\n");
    };
    let phase = &data.phase;

    let mut labels: Vec<String> = phase
        .labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    labels.sort();

    let sync = match phase.is_synced() {
        Some(true) => "synced",
        Some(false) => "out of sync",
        None => "n/a",
    };

    let rows = [
        ("Phase", phase.name.clone()),
        ("Pipeline", data.pipeline.clone()),
        ("Depends on", phase.dependency().unwrap_or("-").to_string()),
        ("Source", phase.source.kind.to_string()),
        ("Digest", phase.digest().unwrap_or("-").to_string()),
        ("Sync", sync.to_string()),
        (
            "Labels",
            if labels.is_empty() {
                "-".to_string()
            } else {
                labels.join(", ")
            },
        ),
    ];
    for (name, value) in rows {
        out.push(format!("  {:<11} {}", format!("{}:", name), value));
    }

    out.join("\n")
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

/// Absolute cell rectangle of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    x: i64,
    y: i64,
    w: i64,
    h: i64,
}

impl Rect {
    fn of(graph: &Graph, node: &GraphNode) -> Option<Self> {
        let Position { x, y } = graph.absolute_position(&node.id)?;
        let size = match &node.data {
            NodeData::Group(_) => node.extent(),
            NodeData::Phase(_) => node.measured.unwrap_or_else(|| measure(node)),
        };
        Some(Self {
            x: x.round() as i64,
            y: y.round() as i64,
            w: size.width.round() as i64,
            h: size.height.round() as i64,
        })
    }

    fn mid_y(self) -> i64 {
        self.y + self.h / 2
    }
}

#[derive(Debug, Clone, Copy)]
enum Border {
    Light,
    Heavy,
    Rounded,
}

impl Border {
    /// Corners (top-left, top-right, bottom-left, bottom-right), horizontal, vertical
    fn chars(self) -> ([char; 4], char, char) {
        match self {
            Border::Light => (['┌', '┐', '└', '┘'], '─', '│'),
            Border::Heavy => (['╔', '╗', '╚', '╝'], '═', '║'),
            Border::Rounded => (['╭', '╮', '╰', '╯'], '┄', '┆'),
        }
    }
}

struct Canvas {
    origin: (i64, i64),
    cells: Vec<Vec<char>>,
}

impl Canvas {
    fn new(origin: (i64, i64), width: usize, height: usize) -> Self {
        Self {
            origin,
            cells: vec![vec![' '; width]; height],
        }
    }

    fn put(&mut self, x: i64, y: i64, ch: char) {
        let (cx, cy) = (x - self.origin.0, y - self.origin.1);
        if cx < 0 || cy < 0 {
            return;
        }
        if let Some(cell) = self
            .cells
            .get_mut(cy as usize)
            .and_then(|row| row.get_mut(cx as usize))
        {
            *cell = ch;
        }
    }

    fn text(&mut self, x: i64, y: i64, text: &str, max: i64) {
        let max = max.max(0) as usize;
        for (i, ch) in truncate(text, max).chars().enumerate() {
            self.put(x + i as i64, y, ch);
        }
    }

    fn hline(&mut self, x0: i64, x1: i64, y: i64, ch: char) {
        for x in x0.min(x1)..=x0.max(x1) {
            self.put(x, y, ch);
        }
    }

    fn vline(&mut self, x: i64, y0: i64, y1: i64, ch: char) {
        for y in y0.min(y1)..=y0.max(y1) {
            self.put(x, y, ch);
        }
    }

    fn fill(&mut self, rect: Rect) {
        for y in rect.y..rect.y + rect.h {
            self.hline(rect.x, rect.x + rect.w - 1, y, ' ');
        }
    }

    fn frame(&mut self, rect: Rect, border: Border) {
        if rect.w < 2 || rect.h < 2 {
            return;
        }
        let ([tl, tr, bl, br], horizontal, vertical) = border.chars();
        let (x1, y1) = (rect.x + rect.w - 1, rect.y + rect.h - 1);

        self.hline(rect.x, x1, rect.y, horizontal);
        self.hline(rect.x, x1, y1, horizontal);
        self.vline(rect.x, rect.y, y1, vertical);
        self.vline(x1, rect.y, y1, vertical);
        self.put(rect.x, rect.y, tl);
        self.put(x1, rect.y, tr);
        self.put(rect.x, y1, bl);
        self.put(x1, y1, br);
    }

    /// Routes an edge from the right side of `source` to the left side of
    /// `target` with one vertical jog, ending in an arrow head
    fn edge(&mut self, source: Rect, target: Rect, glyph: char) {
        let (sx, sy) = (source.x + source.w, source.mid_y());
        let (tx, ty) = (target.x - 1, target.mid_y());
        let mid = (sx + tx) / 2;

        self.hline(sx, mid, sy, '─');
        self.hline(mid, tx, ty, '─');
        if sy != ty {
            self.vline(mid, sy, ty, '│');
            let (top, bottom) = if ty > sy { ('┐', '└') } else { ('┘', '┌') };
            self.put(mid, sy, top);
            self.put(mid, ty, bottom);
        }
        self.put(tx, ty, '▶');

        let glyph_x = if tx - mid >= 2 { mid + 1 } else { mid };
        self.put(glyph_x, ty, glyph);
    }

    fn into_string(self) -> String {
        self.cells
            .into_iter()
            .map(|row| row.into_iter().collect::<String>().trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

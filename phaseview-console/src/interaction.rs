//! Interaction state
//!
//! Selection, detail panel expansion and the open dialog. Nothing here
//! writes graph data or action state.

use crate::store::GraphStore;

/// Modal dialog currently shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    /// Confirm a promotion along an edge
    Promote { edge: String },
    /// Confirm a rollback to a history entry
    Rollback {
        pipeline: String,
        phase: String,
        index: usize,
    },
    /// Details of one history entry
    Details {
        pipeline: String,
        phase: String,
        index: usize,
    },
    /// History of a phase
    History { pipeline: String, phase: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    selected: Option<String>,
    panel_expanded: bool,
    dialog: Option<Dialog>,
}

impl Default for Interaction {
    fn default() -> Self {
        Self {
            selected: None,
            panel_expanded: true,
            dialog: None,
        }
    }
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Selects a phase node; anything else is refused and the selection kept
    pub fn select(&mut self, store: &GraphStore, id: &str) -> bool {
        match store.graph().node(id) {
            Some(node) if node.is_phase() => {
                self.selected = Some(id.to_string());
                true
            }
            _ => false,
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn panel_expanded(&self) -> bool {
        self.panel_expanded
    }

    pub fn toggle_panel(&mut self) {
        self.panel_expanded = !self.panel_expanded;
    }

    pub fn dialog(&self) -> Option<&Dialog> {
        self.dialog.as_ref()
    }

    /// Shows a dialog, replacing any open one
    pub fn open_dialog(&mut self, dialog: Dialog) {
        self.dialog = Some(dialog);
    }

    /// Closes the open dialog and returns it
    pub fn close_dialog(&mut self) -> Option<Dialog> {
        self.dialog.take()
    }

    /// Drops references to nodes and edges that no longer exist
    pub fn prune(&mut self, store: &GraphStore) {
        let graph = store.graph();

        if self.selected.as_deref().is_some_and(|id| graph.node(id).is_none()) {
            self.selected = None;
        }

        if matches!(&self.dialog, Some(Dialog::Promote { edge }) if graph.edge(edge).is_none()) {
            self.dialog = None;
        }
    }

    /// Forgets everything, as when the view changes
    pub fn reset(&mut self) {
        self.selected = None;
        self.dialog = None;
    }
}

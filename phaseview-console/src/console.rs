//! Console
//!
//! Ties the store, live sync, dispatcher, history viewer and interaction
//! state together. Every handler here runs on the event loop's task; the
//! components only talk to the engine through the tasks they spawn, whose
//! answers come back through the [`Inbox`].

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Utc};
use colored::*;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::dispatch::{Action, ActionDispatcher, ActionDone, ActionKey, ActionState, DispatchError};
use crate::history::{HistoryOutcome, HistoryStatus, HistoryUpdate, HistoryViewer};
use crate::interaction::{Dialog, Interaction};
use crate::notice::{Notice, NoticeLevel};
use crate::render::{self, RenderState};
use crate::repository::{ActionRepository, HistoryRepository, PipelineRepository};
use crate::store::{GraphStore, Reconcile};
use crate::sync::{FetchOutcome, LiveSync, SyncUpdate, ViewTarget};

/// Receiving ends for the answers of spawned engine calls
pub struct Inbox {
    pub fetches: mpsc::UnboundedReceiver<FetchOutcome>,
    pub actions: mpsc::UnboundedReceiver<ActionDone>,
    pub history: mpsc::UnboundedReceiver<HistoryOutcome>,
}

/// Whether the event loop keeps going after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Console {
    store: GraphStore,
    sync: LiveSync,
    dispatcher: ActionDispatcher,
    history: HistoryViewer,
    interaction: Interaction,
    /// Action whose confirmation dialog is open
    confirming: Option<ActionKey>,
    notice: Option<Notice>,
    sync_error: Option<String>,
}

impl Console {
    pub fn new(
        pipelines: Arc<dyn PipelineRepository>,
        actions: Arc<dyn ActionRepository>,
        history: Arc<dyn HistoryRepository>,
    ) -> (Self, Inbox) {
        let (fetch_tx, fetches) = mpsc::unbounded_channel();
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let (history_tx, history_rx) = mpsc::unbounded_channel();

        let console = Self {
            store: GraphStore::default(),
            sync: LiveSync::new(pipelines, fetch_tx),
            dispatcher: ActionDispatcher::new(actions, action_tx),
            history: HistoryViewer::new(history, history_tx),
            interaction: Interaction::new(),
            confirming: None,
            notice: None,
            sync_error: None,
        };
        let inbox = Inbox {
            fetches,
            actions: action_rx,
            history: history_rx,
        };

        (console, inbox)
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    pub fn history(&self) -> &HistoryViewer {
        &self.history
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Message of the last failed fetch, cleared by the next good one
    pub fn sync_error(&self) -> Option<&str> {
        self.sync_error.as_deref()
    }

    /// Switches to another view and starts fetching it
    pub fn view(&mut self, target: ViewTarget) {
        self.cancel_pending();
        self.sync.set_view(target);
        self.store.clear();
        self.interaction.reset();
        self.history.close();
        self.sync_error = None;
        self.sync.tick();
    }

    /// Poll interval elapsed
    pub fn tick(&mut self) {
        self.sync.tick();
    }

    /// Stops all background work
    pub fn shutdown(&mut self) {
        info!("Shutting down console");
        self.sync.stop();
        self.history.close();
    }

    /// Handles a fetch outcome; returns whether the screen changed
    pub fn on_fetch(&mut self, outcome: FetchOutcome) -> bool {
        match self.sync.accept(outcome) {
            SyncUpdate::Applied(pipelines) => {
                self.sync_error = None;
                match self.store.apply(&pipelines) {
                    Reconcile::Rebuilt => {
                        if let Err(e) = self.store.layout_with(render::measure) {
                            warn!("Layout failed: {}", e);
                            self.notice = Some(Notice::error(e.to_string()));
                        }
                    }
                    // A failing layout was reported when the structure arrived
                    Reconcile::Refreshed => {
                        if let Err(e) = self.store.remeasure(render::measure) {
                            debug!("Layout still failing: {}", e);
                        }
                    }
                }

                let had_dialog = self.interaction.dialog().is_some();
                self.interaction.prune(&self.store);
                if had_dialog && self.interaction.dialog().is_none() {
                    self.cancel_pending();
                }
                self.dispatcher.settle_all();
                true
            }
            SyncUpdate::Failed(message) => {
                // Notify once per outage; the header keeps showing it
                if self.sync_error.is_none() {
                    self.notice = Some(Notice::error(format!("Failed to refresh: {}", message)));
                }
                self.sync_error = Some(message);
                true
            }
            SyncUpdate::Discarded => false,
        }
    }

    /// Handles the engine's answer to an action
    ///
    /// A finished action triggers an immediate refresh so its effect shows
    /// up without waiting for the next tick.
    pub fn on_action(&mut self, done: ActionDone) -> bool {
        let rolled_back = match &done.action {
            Action::Rollback {
                pipeline, phase, ..
            } if done.result.is_ok() => Some((pipeline.clone(), phase.clone())),
            _ => None,
        };

        let Some(notice) = self.dispatcher.complete(done) else {
            return false;
        };
        self.notice = Some(notice);
        self.sync.tick();

        if let Some((pipeline, phase)) = rolled_back {
            if self.history.is_open_on(&pipeline, &phase) {
                self.history.close();
                self.history.open(&pipeline, &phase);
            }
        }
        true
    }

    /// Handles a history outcome; returns whether the screen changed
    pub fn on_history(&mut self, outcome: HistoryOutcome) -> bool {
        match self.history.load(outcome) {
            HistoryUpdate::Loaded(count) => {
                debug!("Loaded {} history entries", count);
                true
            }
            HistoryUpdate::Failed(message) => {
                self.notice = Some(Notice::error(format!(
                    "Failed to load history: {}",
                    message
                )));
                true
            }
            HistoryUpdate::Discarded => false,
        }
    }

    /// Runs one line of operator input
    pub fn execute(&mut self, line: &str) -> Flow {
        let command = match Command::parse_line(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Flow::Continue,
            Err(message) => {
                self.notice = Some(Notice::error(message));
                return Flow::Continue;
            }
        };

        match self.run(command) {
            Ok(flow) => flow,
            Err(e) => {
                self.notice = Some(Notice::error(e.to_string()));
                Flow::Continue
            }
        }
    }

    fn run(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::View { target } => {
                let target = if target == "all" {
                    ViewTarget::All
                } else {
                    ViewTarget::Pipeline(target)
                };
                self.notice = Some(Notice::info(format!("Viewing {}", target)));
                self.view(target);
            }
            Command::Select { phase } => {
                let id = self.resolve(&phase)?;
                self.interaction.select(&self.store, &id);
            }
            Command::Toggle => self.interaction.toggle_panel(),
            Command::Promote { from, to } => self.promote(&from, &to)?,
            Command::Rollback { phase, index } => self.rollback(&phase, index)?,
            Command::History { phase } => {
                let (pipeline, phase) = self.phase_of(&phase)?;
                self.history.open(&pipeline, &phase);
                self.show(Dialog::History { pipeline, phase });
            }
            Command::Details { index } => {
                let (pipeline, phase) = self
                    .history
                    .target()
                    .map(|(p, f)| (p.to_string(), f.to_string()))
                    .ok_or_else(|| anyhow!("No history is open"))?;
                if self.history.state(index).is_none() {
                    bail!("No history entry {}", index);
                }
                self.show(Dialog::Details {
                    pipeline,
                    phase,
                    index,
                });
            }
            Command::Close => self.close(),
            Command::Confirm => {
                let key = self
                    .confirming
                    .take()
                    .ok_or_else(|| anyhow!("Nothing to confirm"))?;
                self.interaction.close_dialog();
                self.back_to_history();
                self.dispatcher.confirm(&key)?;
            }
            Command::Cancel => {
                if self.confirming.is_none() {
                    bail!("Nothing to cancel");
                }
                self.cancel_pending();
                self.interaction.close_dialog();
                self.back_to_history();
            }
            Command::Refresh => {
                if self.sync.target().is_none() {
                    bail!("Not viewing anything");
                }
                if self.sync.tick().is_none() {
                    bail!("Earlier refreshes are still waiting on the engine");
                }
            }
            Command::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }

    fn promote(&mut self, from: &str, to: &str) -> Result<()> {
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;
        let (edge, action) = {
            let edge = self
                .store
                .edge_between(&source, &target)
                .ok_or_else(|| anyhow!("{} does not promote from {}", to, from))?;
            let action = Action::Promote {
                from: edge.data.from.clone(),
                to: edge.data.to.clone(),
            };
            (edge.id.clone(), action)
        };

        self.begin(action, Dialog::Promote { edge })
    }

    fn rollback(&mut self, reference: &str, index: usize) -> Result<()> {
        let (pipeline, phase) = self.phase_of(reference)?;
        let loaded = matches!(self.history.status(), Some(HistoryStatus::Loaded(_)));
        if !self.history.is_open_on(&pipeline, &phase) || !loaded {
            bail!("Open the history of {} first", reference);
        }
        if index == 0 {
            return Err(DispatchError::CurrentVersion(ActionKey::new(pipeline, phase)).into());
        }

        let action = self
            .history
            .rollback_action(index)
            .ok_or_else(|| anyhow!("No history entry {}", index))?;
        self.begin(
            action,
            Dialog::Rollback {
                pipeline,
                phase,
                index,
            },
        )
    }

    /// Opens the confirmation step of an action and its dialog
    fn begin(&mut self, action: Action, dialog: Dialog) -> Result<()> {
        self.cancel_pending();
        let key = action.key();
        self.dispatcher.open(action, &self.store)?;
        self.confirming = Some(key);
        self.interaction.open_dialog(dialog);
        Ok(())
    }

    /// Shows a dialog that needs no confirmation
    fn show(&mut self, dialog: Dialog) {
        self.cancel_pending();
        self.interaction.open_dialog(dialog);
    }

    fn close(&mut self) {
        match self.interaction.close_dialog() {
            Some(Dialog::Promote { .. }) | Some(Dialog::Rollback { .. }) => {
                self.cancel_pending();
                self.back_to_history();
            }
            Some(Dialog::Details { .. }) => self.back_to_history(),
            Some(Dialog::History { .. }) => self.history.close(),
            None => {}
        }
    }

    /// Reopens the history dialog when the viewer is still open
    fn back_to_history(&mut self) {
        if let Some((pipeline, phase)) = self.history.target() {
            let dialog = Dialog::History {
                pipeline: pipeline.to_string(),
                phase: phase.to_string(),
            };
            self.interaction.open_dialog(dialog);
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(key) = self.confirming.take() {
            if self.dispatcher.cancel(&key).is_ok() {
                debug!("Cancelled pending action for {}", key);
            }
        }
    }

    fn resolve(&self, reference: &str) -> Result<String> {
        self.store
            .resolve_phase(reference)
            .map(|node| node.id.clone())
            .ok_or_else(|| anyhow!("No phase named {}", reference))
    }

    fn phase_of(&self, reference: &str) -> Result<(String, String)> {
        self.store
            .resolve_phase(reference)
            .and_then(|node| node.phase())
            .map(|data| (data.pipeline.clone(), data.phase.name.clone()))
            .ok_or_else(|| anyhow!("No phase named {}", reference))
    }

    /// Composes the full screen
    pub fn screen(&self, now: DateTime<Utc>) -> String {
        let mut out = vec![self.header(), String::new()];

        if !self.store.is_loaded() {
            out.push("Loading…".dimmed().to_string());
        } else if self.store.graph().nodes.is_empty() {
            out.push("No pipelines".dimmed().to_string());
        } else {
            out.push(render::render(self.store.graph(), &self.render_state()));
        }

        out.push(String::new());
        out.push(render::render_panel(
            self.store.graph(),
            self.interaction.selected(),
            self.interaction.panel_expanded(),
        ));
        if let Some(line) = self.action_line() {
            out.push(line);
        }

        if let Some(dialog) = self.interaction.dialog() {
            out.push(String::new());
            out.extend(self.dialog_lines(dialog, now));
        }

        if let Some(notice) = &self.notice {
            out.push(String::new());
            let text = notice.to_string();
            out.push(match notice.level {
                NoticeLevel::Info => text,
                NoticeLevel::Success => format!("✓ {}", text).green().to_string(),
                NoticeLevel::Error => format!("✗ {}", text).red().to_string(),
            });
        }

        out.join("\n")
    }

    fn header(&self) -> String {
        let target = self
            .sync
            .target()
            .map(ToString::to_string)
            .unwrap_or_else(|| "stopped".to_string());
        let status = match &self.sync_error {
            Some(message) => format!("sync failed: {}", message).red().to_string(),
            None if self.store.is_loaded() => "live".green().to_string(),
            None => "connecting".yellow().to_string(),
        };

        format!("{} · {} · {}", "phaseview".bold(), target, status)
    }

    fn render_state(&self) -> RenderState {
        let pending = self
            .store
            .graph()
            .edges
            .iter()
            .filter(|e| {
                self.dispatcher
                    .is_busy(&ActionKey::new(&e.data.to.pipeline, &e.data.to.name))
            })
            .map(|e| e.id.clone())
            .collect();

        RenderState {
            selected: self.interaction.selected().map(str::to_string),
            pending,
        }
    }

    /// Action state of the selected phase, when it has one
    fn action_line(&self) -> Option<String> {
        let data = self
            .interaction
            .selected()
            .and_then(|id| self.store.graph().node(id))
            .and_then(|node| node.phase())?;
        let key = ActionKey::new(&data.pipeline, &data.phase.name);

        match self.dispatcher.state(&key) {
            ActionState::Idle => None,
            ActionState::Confirming(_) => Some("  Action:     awaiting confirmation".to_string()),
            ActionState::InFlight(_) => Some("  Action:     in progress…".yellow().to_string()),
            ActionState::Succeeded(notice) => {
                Some(format!("  Action:     {}", notice).green().to_string())
            }
            ActionState::Failed(notice) => Some(format!("  Action:     {}", notice).red().to_string()),
        }
    }

    fn dialog_lines(&self, dialog: &Dialog, now: DateTime<Utc>) -> Vec<String> {
        match dialog {
            Dialog::Promote { .. } | Dialog::Rollback { .. } => {
                let Some(ActionState::Confirming(action)) =
                    self.confirming.as_ref().map(|key| self.dispatcher.state(key))
                else {
                    return Vec::new();
                };
                let question = match action {
                    Action::Promote { .. } => "Are you sure you want to promote this phase?",
                    Action::Rollback { .. } => "Are you sure you want to roll back this phase?",
                };
                vec![
                    action.prompt().bold().to_string(),
                    question.to_string(),
                    "confirm / cancel".dimmed().to_string(),
                ]
            }
            Dialog::History { pipeline, phase } => self.history_lines(pipeline, phase, now),
            Dialog::Details {
                pipeline,
                phase,
                index,
            } => self.details_lines(pipeline, phase, *index, now),
        }
    }

    fn history_lines(&self, pipeline: &str, phase: &str, now: DateTime<Utc>) -> Vec<String> {
        let mut lines = vec![format!("History of {}/{}", pipeline, phase).bold().to_string()];

        match self.history.status() {
            None | Some(HistoryStatus::Loading) => lines.push("  Loading…".to_string()),
            Some(HistoryStatus::Failed(message)) => {
                lines.push(format!("  Failed to load history: {}", message).red().to_string())
            }
            Some(HistoryStatus::Loaded(states)) if states.is_empty() => {
                lines.push("  No recorded states".to_string())
            }
            Some(HistoryStatus::Loaded(_)) => {
                for entry in self.history.entries(now) {
                    lines.push(format!(
                        "  [{}] {:<30}  {}{}",
                        entry.index,
                        entry.digest.as_deref().unwrap_or("-"),
                        entry.recorded,
                        if entry.is_current { "  (current)" } else { "" }
                    ));
                }
                lines.push("details <index> · rollback <phase> <index> · close".dimmed().to_string());
            }
        }

        lines
    }

    fn details_lines(
        &self,
        pipeline: &str,
        phase: &str,
        index: usize,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let Some(entry) = self.history.entries(now).into_iter().nth(index) else {
            return Vec::new();
        };
        let digest = self
            .history
            .state(index)
            .and_then(|state| state.digest.clone())
            .unwrap_or_else(|| "-".to_string());

        let mut lines = vec![
            format!("Entry {} of {}/{}", index, pipeline, phase).bold().to_string(),
            format!("  Version:     {}", entry.version),
            format!("  Digest:      {}", digest),
            format!("  Recorded:    {} ({})", entry.recorded, entry.recorded_utc),
        ];
        if let Some(url) = &entry.commit_url {
            lines.push(format!("  Commit:      {}", url));
        }
        for (key, value) in &entry.annotations {
            lines.push(format!("  {} = {}", key, value));
        }
        if entry.can_rollback {
            lines.push(format!("rollback {} {} · close", phase, index).dimmed().to_string());
        }

        lines
    }
}

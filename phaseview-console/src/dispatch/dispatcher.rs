//! Action dispatcher
//!
//! Owns the per-phase action state. Backend calls run as spawned tasks and
//! report back through a channel; the dispatcher never touches graph data,
//! the outcome only becomes visible through the next refresh.

use phaseview_client::PromotionResult;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::action::{Action, ActionKey};
use super::error::DispatchError;
use crate::notice::Notice;
use crate::repository::{ActionRepository, user_message};
use crate::store::GraphStore;

/// Where an action for one phase stands
#[derive(Debug, Clone, PartialEq)]
pub enum ActionState {
    Idle,
    /// Dialog open, awaiting confirmation
    Confirming(Action),
    /// Sent to the engine, awaiting its answer
    InFlight(Action),
    Succeeded(Notice),
    Failed(Notice),
}

static IDLE: ActionState = ActionState::Idle;

/// Answer to a dispatched action
#[derive(Debug)]
pub struct ActionDone {
    pub action: Action,
    pub result: Result<PromotionResult, String>,
}

pub struct ActionDispatcher {
    repository: Arc<dyn ActionRepository>,
    states: HashMap<ActionKey, ActionState>,
    completions: mpsc::UnboundedSender<ActionDone>,
}

impl ActionDispatcher {
    pub fn new(
        repository: Arc<dyn ActionRepository>,
        completions: mpsc::UnboundedSender<ActionDone>,
    ) -> Self {
        Self {
            repository,
            states: HashMap::new(),
            completions,
        }
    }

    pub fn state(&self, key: &ActionKey) -> &ActionState {
        self.states.get(key).unwrap_or(&IDLE)
    }

    /// Whether an action for the phase is confirming or in flight
    pub fn is_busy(&self, key: &ActionKey) -> bool {
        matches!(
            self.state(key),
            ActionState::Confirming(_) | ActionState::InFlight(_)
        )
    }

    /// Whether an action for the phase is waiting on the engine
    pub fn is_in_flight(&self, key: &ActionKey) -> bool {
        matches!(self.state(key), ActionState::InFlight(_))
    }

    /// Opens the confirmation step for an action
    ///
    /// Refused when the phase already has a pending action, when the
    /// promotion would be a no-op, or when rolling back to the current
    /// version.
    pub fn open(&mut self, action: Action, store: &GraphStore) -> Result<(), DispatchError> {
        let key = action.key();
        if self.is_busy(&key) {
            return Err(DispatchError::Busy(key));
        }

        match &action {
            Action::Promote { from, to } => {
                let edge = store.promotion_edge(from, to).ok_or_else(|| {
                    DispatchError::UnknownEdge {
                        from: ActionKey::new(&from.pipeline, &from.name),
                        to: ActionKey::new(&to.pipeline, &to.name),
                    }
                })?;
                if edge.data.can_perform {
                    return Err(DispatchError::UpToDate(key));
                }
            }
            Action::Rollback { index: 0, .. } => return Err(DispatchError::CurrentVersion(key)),
            Action::Rollback { .. } => {}
        }

        debug!("Awaiting confirmation for {}", key);
        self.states.insert(key, ActionState::Confirming(action));
        Ok(())
    }

    /// Closes the confirmation step without dispatching
    pub fn cancel(&mut self, key: &ActionKey) -> Result<Action, DispatchError> {
        match self.states.remove(key) {
            Some(ActionState::Confirming(action)) => Ok(action),
            Some(other) => {
                self.states.insert(key.clone(), other);
                Err(DispatchError::NotConfirming(key.clone()))
            }
            None => Err(DispatchError::NotConfirming(key.clone())),
        }
    }

    /// Sends a confirmed action to the engine
    ///
    /// Spawns exactly one backend call; its answer arrives as an
    /// [`ActionDone`] to be passed to [`complete`](Self::complete).
    pub fn confirm(&mut self, key: &ActionKey) -> Result<(), DispatchError> {
        let action = match self.state(key) {
            ActionState::Confirming(action) => action.clone(),
            ActionState::InFlight(_) => return Err(DispatchError::Busy(key.clone())),
            _ => return Err(DispatchError::NotConfirming(key.clone())),
        };

        info!("Dispatching {:?}", action);
        self.states
            .insert(key.clone(), ActionState::InFlight(action.clone()));

        let repository = Arc::clone(&self.repository);
        let completions = self.completions.clone();

        tokio::spawn(async move {
            let result = match &action {
                // Edges are addressed under the upstream pipeline
                Action::Promote { from, to } => {
                    repository
                        .perform_edge(&from.pipeline, &from.name, &to.name)
                        .await
                }
                Action::Rollback {
                    pipeline,
                    phase,
                    version,
                    ..
                } => repository.rollback(pipeline, phase, *version).await,
            };

            let result = result.map_err(|e| user_message(&e));
            // The receiver only goes away on shutdown
            let _ = completions.send(ActionDone { action, result });
        });

        Ok(())
    }

    /// Records the engine's answer and returns the notice to show
    ///
    /// Answers for an action that is no longer in flight are ignored.
    pub fn complete(&mut self, done: ActionDone) -> Option<Notice> {
        let key = done.action.key();
        match self.state(&key) {
            ActionState::InFlight(action) if *action == done.action => {}
            _ => {
                debug!("Ignoring answer for {} with no matching action in flight", key);
                return None;
            }
        }

        let state = match done.result {
            Ok(result) => ActionState::Succeeded(success_notice(&done.action, &result)),
            Err(message) => {
                error!("Action for {} failed: {}", key, message);
                ActionState::Failed(Notice::error(message))
            }
        };

        let notice = match &state {
            ActionState::Succeeded(notice) | ActionState::Failed(notice) => notice.clone(),
            _ => return None,
        };
        self.states.insert(key, state);
        Some(notice)
    }

    /// Returns a finished action for the phase to idle
    pub fn settle(&mut self, key: &ActionKey) {
        if matches!(
            self.state(key),
            ActionState::Succeeded(_) | ActionState::Failed(_)
        ) {
            self.states.remove(key);
        }
    }

    /// Returns every finished action to idle
    pub fn settle_all(&mut self) {
        self.states.retain(|_, state| {
            matches!(state, ActionState::Confirming(_) | ActionState::InFlight(_))
        });
    }
}

fn success_notice(action: &Action, result: &PromotionResult) -> Notice {
    match action {
        Action::Promote { .. } => match result.proposal_url() {
            Some(url) => Notice::success("Phase promotion proposed").with_link(url),
            None => Notice::success("Phase promotion scheduled"),
        },
        Action::Rollback { .. } => Notice::success("Phase version updated"),
    }
}

//! Dispatcher refusals

use thiserror::Error;

use super::action::ActionKey;

/// Reasons an action request is refused before reaching the engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("an action for {0} is already pending")]
    Busy(ActionKey),

    #[error("{0} is already up to date")]
    UpToDate(ActionKey),

    #[error("{0} is already at this version")]
    CurrentVersion(ActionKey),

    #[error("no action awaiting confirmation for {0}")]
    NotConfirming(ActionKey),

    #[error("no promotion from {from} to {to}")]
    UnknownEdge { from: ActionKey, to: ActionKey },
}

//! Action dispatch layer
//!
//! Promotions and rollbacks go through a per-phase state machine:
//! idle, confirming (dialog open), in flight, then succeeded or failed until
//! the next refresh settles it back to idle. At most one action per
//! (pipeline, phase) is ever confirming or in flight.

pub mod action;
pub mod dispatcher;
pub mod error;

pub use action::{Action, ActionKey};
pub use dispatcher::{ActionDispatcher, ActionDone, ActionState};
pub use error::DispatchError;

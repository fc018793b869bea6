//! Live sync layer
//!
//! Keeps the viewed pipelines in step with the engine. Every poll tick
//! spawns a fetch without waiting for earlier ones; results are ordered by
//! the sequencer so a slow, older response never overwrites fresher data,
//! and results from a view that has since been left are dropped.

pub mod controller;
pub mod sequencer;

pub use controller::{FetchOutcome, LiveSync, SyncUpdate, ViewTarget};
pub use sequencer::{SyncSequencer, Ticket};

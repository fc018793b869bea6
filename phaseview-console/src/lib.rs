//! Phaseview Console
//!
//! Live terminal control surface for a pipeline engine.
//!
//! Architecture:
//! - Configuration: engine URL, initial view and poll cadence
//! - Repositories: HTTP reads and commands against the engine
//! - Store: the laid out graph, reconciled on every fetch
//! - Sync: polling with stale-response suppression
//! - Dispatch: confirmed promotions and rollbacks, one per phase
//! - History: per-phase recorded states
//! - Interaction, render and console: selection, drawing and commands

pub mod command;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod history;
pub mod interaction;
pub mod notice;
pub mod render;
pub mod repository;
pub mod store;
pub mod sync;

//! Core domain types
//!
//! Immutable snapshots of the pipeline engine's state as the client sees it.
//! Nothing here is mutated client-side: promotions and rollbacks happen on the
//! engine and are observed through the next fetch.

pub mod annotations;
pub mod phase;
pub mod pipeline;
pub mod state;
pub mod system;

//! Data Transfer Objects
//!
//! Envelopes the engine's REST API wraps around domain types.

pub mod pipeline;
pub mod promotion;

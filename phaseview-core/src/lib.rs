//! Phaseview Core
//!
//! Core types shared by the Phaseview control surface.
//!
//! This crate contains:
//! - Domain types: the pipeline engine's entities (Pipeline, Phase, Edge, State)
//! - DTOs: response envelopes of the engine's REST API

pub mod domain;
pub mod dto;

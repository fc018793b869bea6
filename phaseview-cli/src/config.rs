//! Configuration module
//!
//! Handles CLI configuration, currently only the engine location.

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the engine API
    pub engine_url: String,
}

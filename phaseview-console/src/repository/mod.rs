//! Repository layer
//!
//! Repositories are stateless adapters over the engine API. They give the
//! sync, action and history controllers small, focused interfaces and hold
//! no business logic.
//!
//! All repositories are trait-based so controllers can be driven by fakes
//! in tests.

mod actions;
mod history;
mod pipelines;

// Re-export traits
pub use actions::ActionRepository;
pub use history::HistoryRepository;
pub use pipelines::PipelineRepository;

// Re-export implementations
pub use actions::HttpActionRepository;
pub use history::HttpHistoryRepository;
pub use pipelines::HttpPipelineRepository;

/// Reduces a repository error to the message shown to the operator
///
/// Engine errors carry the backend's own message; anything else is shown
/// with its full context chain.
pub fn user_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<phaseview_client::ClientError>() {
        Some(client_error) => client_error.user_message(),
        None => format!("{:#}", err),
    }
}

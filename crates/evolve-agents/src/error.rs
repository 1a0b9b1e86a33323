//! Error types for the evolve-agents crate.
//!
//! Agent operations that can fail return typed errors rather than panicking.

/// Errors that can occur during agent operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Movement bounds cannot contain the agent.
    #[error("invalid movement bounds: {reason}")]
    InvalidBounds {
        /// Explanation of what is wrong with the bounds.
        reason: String,
    },
}

//! Error types for the `evolve-world` crate.
//!
//! Operations that reference an agent the board does not hold are tolerant
//! no-ops and never produce these errors; only invalid input does.

use evolve_agents::AgentError;
use evolve_types::AgentId;

/// Errors that can occur during board operations.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// The grid or arena geometry is unusable.
    #[error("invalid board geometry: {reason}")]
    InvalidGeometry {
        /// Explanation of what is wrong with the geometry.
        reason: String,
    },

    /// A neighborhood scan was requested with a negative radius.
    #[error("radius must be a non-negative integer, {0} given instead")]
    NegativeRadius(i64),

    /// The agent cannot fit inside the arena.
    #[error("agent {agent} of size ({width}, {height}) does not fit in the arena")]
    AgentTooLarge {
        /// The rejected agent.
        agent: AgentId,
        /// Agent width.
        width: f64,
        /// Agent height.
        height: f64,
    },

    /// An agent movement failed.
    #[error("agent error: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: AgentError,
    },
}

//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and simulation execution.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: evolve_core::config::ConfigError,
    },

    /// Scheduler construction failed.
    #[error("scheduler error: {source}")]
    Scheduler {
        /// The underlying scheduler error.
        #[from]
        source: evolve_core::scheduler::SchedulerError,
    },

    /// An agent could not be placed on the board.
    #[error("board error: {source}")]
    Board {
        /// The underlying board error.
        #[from]
        source: evolve_world::BoardError,
    },

    /// A scenario task was rejected.
    #[error("task error: {source}")]
    Task {
        /// The underlying task error.
        #[from]
        source: evolve_core::task::TaskError,
    },

    /// Simulation runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: evolve_core::runner::RunnerError,
    },

    /// Agent generation failed.
    #[error("spawner error: {message}")]
    Spawner {
        /// Description of the spawner failure.
        message: String,
    },
}

//! Agent state, movement, decision functions, and reproduction for the
//! Evolve simulation.
//!
//! This crate contains the logic layer for a single agent -- everything that
//! operates on one agent without knowing about the board that indexes it.
//! It sits between `evolve-types` (geometry and ids) and `evolve-world`
//! (the spatial index).
//!
//! # Modules
//!
//! - [`agent`] -- The [`Agent`] entity: bounded movement, border tags,
//!   acceleration, collision tests, and explicit cloning.
//! - [`brain`] -- The [`Brain`] decision-function trait, [`Decision`], and
//!   stock brains.
//! - [`error`] -- Error types for agent operations ([`AgentError`]).
//! - [`reproduction`] -- Threshold-gated reproduction and the default
//!   clone-and-mutate strategy.

pub mod agent;
pub mod brain;
pub mod error;
pub mod reproduction;

// Re-export primary types at crate root for convenience.
pub use agent::Agent;
pub use brain::{Brain, Decision, LinearBrain, NullBrain, OwnerView, ScriptedBrain};
pub use error::AgentError;
pub use reproduction::{ReproduceFn, Reproduction, default_reproduce};

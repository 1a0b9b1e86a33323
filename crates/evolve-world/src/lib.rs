//! Arena geometry and spatial indexing for the Evolve simulation.
//!
//! This crate models the physical world: a square grid of sectors laid over
//! a bounded 2D arena, the agents occupying it, and the per-tick caches
//! derived from occupancy (collisions, same-sector pairs, neighbor scans).
//!
//! # Modules
//!
//! - [`board`] -- The [`Board`] spatial index: admission, removal,
//!   sector-tracking movement, collision and neighborhood queries.
//! - [`cooldown`] -- Ordered-pair collision cooldown table and the
//!   [`CooldownPolicy`] that arms it.
//! - [`error`] -- Error types for board operations.
//! - [`neighbor`] -- Entries stored in the per-agent neighbor cache.
//! - [`snapshot`] -- Serializable read-only views for rendering
//!   collaborators.

pub mod board;
pub mod cooldown;
pub mod error;
pub mod neighbor;
pub mod snapshot;

// Re-export primary types at crate root.
pub use board::Board;
pub use cooldown::{CooldownPolicy, CooldownTable};
pub use error::BoardError;
pub use neighbor::{Neighbor, NeighborView};
pub use snapshot::{AgentSnapshot, BoardSnapshot};

//! Shared type definitions for the Evolve simulation.
//!
//! This crate is the single source of truth for the small value types used
//! across the Evolve workspace. Everything here is plain data or a pure
//! function: no state, no I/O.
//!
//! # Modules
//!
//! - [`ids`] -- Stable integer handles for agents and tasks
//! - [`enums`] -- Border directions and other closed enumerations
//! - [`geometry`] -- Vectors, rectangles, clamping, and distances

pub mod enums;
pub mod geometry;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use enums::BorderDirection;
pub use geometry::{Distance, MAGNITUDE_EPSILON, Rect, SectorIndex, Vec2, clamp, distance};
pub use ids::{AgentId, TaskId};

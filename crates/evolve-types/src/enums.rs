//! Enumeration types for the Evolve simulation.

use serde::{Deserialize, Serialize};

/// Which arena border an agent was pushed against during its last move.
///
/// An agent that clamps on both axes in one move carries two tags, one per
/// axis. The discriminants are stable and usable as table indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BorderDirection {
    /// Clamped at the lower y bound (moving toward decreasing y).
    Up = 0,
    /// Clamped at the upper x bound (moving toward increasing x).
    Right = 1,
    /// Clamped at the upper y bound (moving toward increasing y).
    Down = 2,
    /// Clamped at the lower x bound (moving toward decreasing x).
    Left = 3,
}

impl BorderDirection {
    /// All four directions in discriminant order.
    pub const ALL: [Self; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    /// Whether this border is perpendicular to the x axis.
    pub const fn is_vertical_wall(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    /// The stable table index of this direction.
    pub const fn index(self) -> usize {
        self as usize
    }
}

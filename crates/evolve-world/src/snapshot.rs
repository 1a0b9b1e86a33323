//! Serializable read-only views of a board.
//!
//! Rendering and export collaborators consume these instead of borrowing
//! the board across an await point.

use evolve_types::{AgentId, Rect, SectorIndex, Vec2};
use serde::{Deserialize, Serialize};

use crate::board::Board;

/// State of one agent at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// Agent id.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Bounding rectangle.
    pub rect: Rect,
    /// Velocity.
    pub velocity: Vec2,
    /// Grid cell the agent occupies.
    pub sector: SectorIndex,
    /// Whether the agent is marked dead.
    pub is_dead: bool,
}

/// State of a whole board at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    /// Arena width and height.
    pub arena_size: Vec2,
    /// Sectors per axis.
    pub sectors_number: usize,
    /// Every admitted agent, in id order.
    pub agents: Vec<AgentSnapshot>,
    /// Pairs reported by the last collision check.
    pub collided: Vec<(AgentId, AgentId)>,
}

impl<S> From<&Board<S>> for BoardSnapshot {
    fn from(board: &Board<S>) -> Self {
        let agents = board
            .agents()
            .map(|agent| AgentSnapshot {
                id: agent.id(),
                name: agent.name().to_owned(),
                rect: *agent.rect(),
                velocity: agent.velocity(),
                sector: agent.sector_index(),
                is_dead: agent.is_dead(),
            })
            .collect();
        Self {
            arena_size: board.arena_size(),
            sectors_number: board.sectors_number(),
            agents,
            collided: board.collided().to_vec(),
        }
    }
}

//! Entries stored in the per-agent neighbor cache.

use evolve_agents::Agent;
use evolve_types::{AgentId, Distance, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Copy of the parts of a neighboring agent a scan callback may read.
///
/// Neighbor callbacks receive a mutable borrow of the scanning agent, so
/// they cannot also borrow its neighbors. The cache therefore stores copies
/// taken at scan time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeighborView {
    /// The neighboring agent.
    pub id: AgentId,
    /// Its rectangle at scan time.
    pub rect: Rect,
    /// Its velocity at scan time.
    pub velocity: Vec2,
}

impl<S> From<&Agent<S>> for NeighborView {
    fn from(agent: &Agent<S>) -> Self {
        Self {
            id: agent.id(),
            rect: *agent.rect(),
            velocity: agent.velocity(),
        }
    }
}

/// One neighbor-cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Neighbor {
    /// A neighboring agent, from a plain scan.
    Agent(NeighborView),
    /// Distance to a neighboring agent, from a distance scan.
    Distance(Distance),
}

impl Neighbor {
    /// Id of the neighboring agent.
    pub const fn id(&self) -> AgentId {
        match self {
            Self::Agent(view) => view.id,
            Self::Distance(distance) => distance.to,
        }
    }
}

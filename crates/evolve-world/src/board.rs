//! The board: a uniform grid of sectors over a bounded arena.
//!
//! The board owns every admitted agent, keyed by [`AgentId`], and keeps a
//! `sectors_number × sectors_number` grid of id lists so spatial queries
//! only look at nearby cells. Per-tick caches (colliding pairs, same-sector
//! pairs, neighbor lists, dead ids) are rebuilt by the check methods and
//! read by the scheduler during dispatch.
//!
//! Sector `(i, j)` covers `[i * w, (i + 1) * w) × [j * h, (j + 1) * h)`
//! where `(w, h)` is the sector size. Positions on the far arena edge are
//! clamped into the last sector.
//!
//! Every method that takes an [`AgentId`] tolerates ids the board does not
//! hold: the call is a traced no-op.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use evolve_agents::Agent;
use evolve_types::{AgentId, Distance, SectorIndex, Vec2, distance};
use tracing::debug;

use crate::cooldown::{CooldownPolicy, CooldownTable};
use crate::error::BoardError;
use crate::neighbor::{Neighbor, NeighborView};

/// Spatial index and owner of all admitted agents.
pub struct Board<S = ()> {
    /// Arena width and height.
    arena_size: Vec2,
    /// Width and height of one sector.
    sector_size: Vec2,
    /// Sectors per axis.
    sectors_number: usize,
    /// `sectors[i][j]` lists the agents whose position falls in sector `(i, j)`.
    sectors: Vec<Vec<Vec<AgentId>>>,
    /// Every admitted agent.
    agents: BTreeMap<AgentId, Agent<S>>,
    /// Neighbor cache, one entry per admitted agent.
    neighbors: BTreeMap<AgentId, Vec<Neighbor>>,
    /// Pairs reported by the last collision check.
    collided: Vec<(AgentId, AgentId)>,
    /// Pairs sharing a sector at the last sector-pair check.
    sector_pairs: Vec<(AgentId, AgentId)>,
    /// Agents marked dead at the last dead check.
    dead: Vec<AgentId>,
    /// Remaining collision cooldown per ordered pair.
    cooldowns: CooldownTable,
    /// Cooldown armed on each reported collision.
    cooldown_policy: CooldownPolicy<S>,
}

impl<S> Board<S> {
    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Create an empty board covering `arena_size`, split into
    /// `sectors_number` sectors per axis.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InvalidGeometry`] if the arena is not finite
    /// and positive or the grid has no sectors.
    pub fn new(
        arena_size: Vec2,
        sectors_number: usize,
        cooldown_policy: CooldownPolicy<S>,
    ) -> Result<Self, BoardError> {
        let valid_axis = |v: f64| v.is_finite() && v > 0.0;
        if !valid_axis(arena_size.x) || !valid_axis(arena_size.y) {
            return Err(BoardError::InvalidGeometry {
                reason: format!(
                    "arena size must be finite and positive, got ({}, {})",
                    arena_size.x, arena_size.y
                ),
            });
        }
        let Ok(per_axis) = u32::try_from(sectors_number) else {
            return Err(BoardError::InvalidGeometry {
                reason: format!("too many sectors per axis: {sectors_number}"),
            });
        };
        if per_axis == 0 {
            return Err(BoardError::InvalidGeometry {
                reason: "sectors number must be at least 1".to_owned(),
            });
        }

        let divisor = f64::from(per_axis);
        let sector_size = Vec2::new(arena_size.x / divisor, arena_size.y / divisor);
        let sectors = vec![vec![Vec::new(); sectors_number]; sectors_number];

        Ok(Self {
            arena_size,
            sector_size,
            sectors_number,
            sectors,
            agents: BTreeMap::new(),
            neighbors: BTreeMap::new(),
            collided: Vec::new(),
            sector_pairs: Vec::new(),
            dead: Vec::new(),
            cooldowns: CooldownTable::new(),
            cooldown_policy,
        })
    }

    /// Create an empty board from the size of one sector; the arena is
    /// `sector_size * sectors_number`.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InvalidGeometry`] under the same conditions as
    /// [`Board::new`].
    pub fn with_sector_size(
        sector_size: Vec2,
        sectors_number: usize,
        cooldown_policy: CooldownPolicy<S>,
    ) -> Result<Self, BoardError> {
        let Ok(per_axis) = u32::try_from(sectors_number) else {
            return Err(BoardError::InvalidGeometry {
                reason: format!("too many sectors per axis: {sectors_number}"),
            });
        };
        let arena_size = sector_size * f64::from(per_axis);
        Self::new(arena_size, sectors_number, cooldown_policy)
    }

    // -----------------------------------------------------------------------
    // Geometry
    // -----------------------------------------------------------------------

    /// Arena width and height.
    pub const fn arena_size(&self) -> Vec2 {
        self.arena_size
    }

    /// Width and height of one sector.
    pub const fn sector_size(&self) -> Vec2 {
        self.sector_size
    }

    /// Sectors per axis.
    pub const fn sectors_number(&self) -> usize {
        self.sectors_number
    }

    /// Sector containing `position`, clamped to the grid.
    pub fn sector_of(&self, position: Vec2) -> SectorIndex {
        let last = self.sectors_number.saturating_sub(1);
        SectorIndex::new(
            grid_cell(position.x, self.sector_size.x, last),
            grid_cell(position.y, self.sector_size.y, last),
        )
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Admit an agent.
    ///
    /// The rectangle is clamped into the arena and the agent is appended to
    /// the sector of its position. Re-adding an id the board already holds
    /// returns that id and changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::AgentTooLarge`] if the agent cannot fit in the
    /// arena.
    pub fn add_agent(&mut self, mut agent: Agent<S>) -> Result<AgentId, BoardError> {
        let id = agent.id();
        if self.agents.contains_key(&id) {
            debug!(agent_id = %id, "Agent already on the board");
            return Ok(id);
        }

        let size = agent.size();
        if size.x > self.arena_size.x || size.y > self.arena_size.y {
            return Err(BoardError::AgentTooLarge {
                agent: id,
                width: size.x,
                height: size.y,
            });
        }

        agent.move_by(Vec2::ZERO, Vec2::ZERO, self.arena_size)?;
        let index = self.sector_of(agent.position());
        agent.set_sector_index(index);

        if let Some(sector) = self.sector_mut(index) {
            sector.push(id);
        }
        self.neighbors.insert(id, Vec::new());
        self.agents.insert(id, agent);

        debug!(agent_id = %id, i = index.i, j = index.j, "Agent admitted");
        Ok(id)
    }

    /// Admit every agent from `agents`, returning their ids in order.
    ///
    /// # Errors
    ///
    /// Stops at the first agent [`Board::add_agent`] rejects; agents
    /// before it stay admitted.
    pub fn add_agents(
        &mut self,
        agents: impl IntoIterator<Item = Agent<S>>,
    ) -> Result<Vec<AgentId>, BoardError> {
        agents.into_iter().map(|agent| self.add_agent(agent)).collect()
    }

    /// Remove an agent and every trace of it from the board's caches.
    ///
    /// Returns the agent, or `None` if the board does not hold it.
    pub fn remove_agent(&mut self, id: AgentId) -> Option<Agent<S>> {
        let Some(agent) = self.agents.remove(&id) else {
            debug!(agent_id = %id, "Remove ignored, agent not on the board");
            return None;
        };

        if let Some(sector) = self.sector_mut(agent.sector_index()) {
            sector.retain(|member| *member != id);
        }
        self.neighbors.remove(&id);
        self.collided.retain(|(a, b)| *a != id && *b != id);
        self.sector_pairs.retain(|(a, b)| *a != id && *b != id);
        self.dead.retain(|dead| *dead != id);
        self.cooldowns.forget(id);

        debug!(agent_id = %id, "Agent removed");
        Some(agent)
    }

    // -----------------------------------------------------------------------
    // Movement
    // -----------------------------------------------------------------------

    /// Advance one agent by `velocity * dt` inside the arena and move it to
    /// its new sector if the position crossed a sector boundary.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Agent`] if the agent no longer fits in the
    /// arena (its size was changed after admission).
    pub fn move_agent(&mut self, id: AgentId, dt: f64) -> Result<(), BoardError> {
        let arena = self.arena_size;
        let Some(agent) = self.agents.get_mut(&id) else {
            debug!(agent_id = %id, "Move ignored, agent not on the board");
            return Ok(());
        };
        agent.move_by_velocity(dt, Vec2::ZERO, arena)?;
        self.resector(id);
        Ok(())
    }

    /// Advance every admitted agent by `velocity * dt`.
    ///
    /// # Errors
    ///
    /// Returns the first [`BoardError`] from [`Board::move_agent`].
    pub fn move_agents(&mut self, dt: f64) -> Result<(), BoardError> {
        for id in self.agent_ids() {
            self.move_agent(id, dt)?;
        }
        Ok(())
    }

    /// Move one agent up to `distance` toward `point` inside the arena,
    /// updating its sector.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Agent`] if the agent no longer fits in the
    /// arena.
    pub fn move_agent_toward(
        &mut self,
        id: AgentId,
        point: Vec2,
        distance: f64,
    ) -> Result<(), BoardError> {
        let arena = self.arena_size;
        let Some(agent) = self.agents.get_mut(&id) else {
            debug!(agent_id = %id, "Move ignored, agent not on the board");
            return Ok(());
        };
        agent.move_toward(point, distance, Vec2::ZERO, arena)?;
        self.resector(id);
        Ok(())
    }

    /// Transfer an agent to the sector matching its current position.
    fn resector(&mut self, id: AgentId) {
        let Some(agent) = self.agents.get(&id) else {
            return;
        };
        let old = agent.sector_index();
        let new = self.sector_of(agent.position());
        if old == new {
            return;
        }

        if let Some(sector) = self.sector_mut(old) {
            sector.retain(|member| *member != id);
        }
        if let Some(sector) = self.sector_mut(new) {
            sector.push(id);
        }
        if let Some(agent) = self.agents.get_mut(&id) {
            agent.set_sector_index(new);
        }
    }

    // -----------------------------------------------------------------------
    // Collisions and cooldowns
    // -----------------------------------------------------------------------

    /// Rebuild the colliding-pair cache.
    ///
    /// Each agent is tested against every sector between the one holding
    /// `position - largest agent size` and the one holding its far corner,
    /// which covers any agent whose rectangle can reach it. Each overlapping
    /// pair is considered once; it is reported only if either ordered
    /// cooldown entry is zero. Reporting arms both entries with the
    /// cooldown policy and sets each agent's colliding peer.
    pub fn check_collision(&mut self) {
        self.collided.clear();
        for agent in self.agents.values_mut() {
            agent.set_colliding(None);
        }
        if self.agents.len() < 2 {
            return;
        }

        let reach = self.agents.values().fold(Vec2::ZERO, |largest, agent| {
            let size = agent.size();
            Vec2::new(largest.x.max(size.x), largest.y.max(size.y))
        });
        let mut seen: BTreeSet<(AgentId, AgentId)> = BTreeSet::new();
        let mut reported: Vec<(AgentId, AgentId)> = Vec::new();

        for (id, agent) in &self.agents {
            let first = self.sector_of(agent.position() - reach);
            let rect = agent.rect();
            let last = self.sector_of(Vec2::new(rect.right(), rect.bottom()));

            for i in first.i..=last.i {
                for j in first.j..=last.j {
                    let Some(members) = self.sector(SectorIndex::new(i, j)) else {
                        continue;
                    };
                    for other_id in members {
                        if other_id == id {
                            continue;
                        }
                        let key = ordered(*id, *other_id);
                        if seen.contains(&key) {
                            continue;
                        }
                        let Some(other) = self.agents.get(other_id) else {
                            continue;
                        };
                        if !agent.is_collide(other) {
                            continue;
                        }
                        seen.insert(key);
                        if self.cooldowns.is_ready(key.0, key.1) {
                            reported.push(key);
                        }
                    }
                }
            }
        }

        for (a, b) in reported {
            let (Some(first), Some(second)) = (self.agents.get(&a), self.agents.get(&b)) else {
                continue;
            };
            let cooldown = self.cooldown_policy.cooldown_for(first, second);
            self.cooldowns.arm(a, b, cooldown);
            if let Some(agent) = self.agents.get_mut(&a) {
                agent.set_colliding(Some(b));
            }
            if let Some(agent) = self.agents.get_mut(&b) {
                agent.set_colliding(Some(a));
            }
            self.collided.push((a, b));
        }

        if !self.collided.is_empty() {
            debug!(pairs = self.collided.len(), "Collisions reported");
        }
    }

    /// Decay every collision cooldown by `dt_ms` milliseconds.
    pub fn decrease_timeout(&mut self, dt_ms: u64) {
        self.cooldowns.decay(dt_ms);
    }

    /// Remaining cooldown for the ordered pair `(from, to)`, in milliseconds.
    pub fn cooldown(&self, from: AgentId, to: AgentId) -> u64 {
        self.cooldowns.get(from, to)
    }

    /// The cooldown table.
    pub const fn cooldowns(&self) -> &CooldownTable {
        &self.cooldowns
    }

    /// The policy armed on each reported collision.
    pub const fn cooldown_policy(&self) -> &CooldownPolicy<S> {
        &self.cooldown_policy
    }

    /// Replace the cooldown policy. Entries already armed keep their value.
    pub fn set_cooldown_policy(&mut self, policy: CooldownPolicy<S>) {
        self.cooldown_policy = policy;
    }

    // -----------------------------------------------------------------------
    // Sector pairs and deaths
    // -----------------------------------------------------------------------

    /// Rebuild the same-sector pair cache: every unordered pair of agents
    /// sharing a sector, with no cooldown.
    pub fn check_sector_pairs(&mut self) {
        self.sector_pairs.clear();
        for members in self.sectors.iter().flatten() {
            for (offset, a) in members.iter().enumerate() {
                for b in members.iter().skip(offset.saturating_add(1)) {
                    self.sector_pairs.push((*a, *b));
                }
            }
        }
    }

    /// Rebuild the dead-agent cache. Removal is left to the caller.
    pub fn check_dead(&mut self) {
        self.dead = self
            .agents
            .values()
            .filter(|agent| agent.is_dead())
            .map(Agent::id)
            .collect();
    }

    // -----------------------------------------------------------------------
    // Neighborhood scans
    // -----------------------------------------------------------------------

    /// Fill the neighbor cache of one agent with the agents found in every
    /// sector within Chebyshev distance `radius` of its own (just its own
    /// sector when `radius` is zero). The agent itself is excluded.
    ///
    /// With `hold_previous` the new entries are appended to the cache
    /// instead of replacing it.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NegativeRadius`] for a negative radius.
    pub fn scan_around_agent(
        &mut self,
        id: AgentId,
        radius: i64,
        hold_previous: bool,
    ) -> Result<(), BoardError> {
        self.scan_with(id, radius, hold_previous, |_, other| {
            Neighbor::Agent(NeighborView::from(other))
        })
    }

    /// [`Board::scan_around_agent`] for every admitted agent.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NegativeRadius`] for a negative radius.
    pub fn scan_around_agents(&mut self, radius: i64, hold_previous: bool) -> Result<(), BoardError> {
        for id in self.agent_ids() {
            self.scan_around_agent(id, radius, hold_previous)?;
        }
        Ok(())
    }

    /// Like [`Board::scan_around_agent`], storing the distance from the
    /// agent's position to each neighbor's position.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NegativeRadius`] for a negative radius.
    pub fn scan_distances_around_agent(
        &mut self,
        id: AgentId,
        radius: i64,
        hold_previous: bool,
    ) -> Result<(), BoardError> {
        self.scan_with(id, radius, hold_previous, |agent, other| {
            Neighbor::Distance(Distance {
                from: agent.id(),
                to: other.id(),
                value: distance(agent.position(), other.position()),
            })
        })
    }

    /// [`Board::scan_distances_around_agent`] for every admitted agent.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NegativeRadius`] for a negative radius.
    pub fn scan_distances_around_agents(
        &mut self,
        radius: i64,
        hold_previous: bool,
    ) -> Result<(), BoardError> {
        for id in self.agent_ids() {
            self.scan_distances_around_agent(id, radius, hold_previous)?;
        }
        Ok(())
    }

    fn scan_with(
        &mut self,
        id: AgentId,
        radius: i64,
        hold_previous: bool,
        entry: impl Fn(&Agent<S>, &Agent<S>) -> Neighbor,
    ) -> Result<(), BoardError> {
        let reach = usize::try_from(radius).map_err(|_err| BoardError::NegativeRadius(radius))?;
        let Some(agent) = self.agents.get(&id) else {
            debug!(agent_id = %id, "Scan ignored, agent not on the board");
            return Ok(());
        };

        let center = agent.sector_index();
        let last = self.sectors_number.saturating_sub(1);
        let i_range = center.i.saturating_sub(reach)..=center.i.saturating_add(reach).min(last);
        let j_range = center.j.saturating_sub(reach)..=center.j.saturating_add(reach).min(last);

        let mut found = Vec::new();
        for i in i_range {
            for j in j_range.clone() {
                let Some(members) = self.sector(SectorIndex::new(i, j)) else {
                    continue;
                };
                for other_id in members.iter().filter(|other| **other != id) {
                    if let Some(other) = self.agents.get(other_id) {
                        found.push(entry(agent, other));
                    }
                }
            }
        }

        let cache = self.neighbors.entry(id).or_default();
        if !hold_previous {
            cache.clear();
        }
        cache.extend(found);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Look up an agent.
    pub fn agent(&self, id: AgentId) -> Option<&Agent<S>> {
        self.agents.get(&id)
    }

    /// Look up an agent mutably.
    ///
    /// Moving the agent through this borrow bypasses sector tracking; use
    /// [`Board::move_agent`] for that.
    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent<S>> {
        self.agents.get_mut(&id)
    }

    /// Run `f` with mutable borrows of two distinct agents.
    ///
    /// Returns `None` if `a == b` or either agent is absent.
    pub fn with_pair_mut<R>(
        &mut self,
        a: AgentId,
        b: AgentId,
        f: impl FnOnce(&mut Agent<S>, &mut Agent<S>) -> R,
    ) -> Option<R> {
        if a == b || !self.agents.contains_key(&b) {
            return None;
        }
        let mut first = self.agents.remove(&a)?;
        let result = self.agents.get_mut(&b).map(|second| f(&mut first, second));
        self.agents.insert(a, first);
        result
    }

    /// Run `f` with a mutable borrow of an agent and its neighbor cache.
    ///
    /// Returns `None` if the agent is absent.
    pub fn with_neighbors_mut<R>(
        &mut self,
        id: AgentId,
        f: impl FnOnce(&mut Agent<S>, &[Neighbor]) -> R,
    ) -> Option<R> {
        let agent = self.agents.get_mut(&id)?;
        let neighbors = self.neighbors.get(&id).map_or(&[][..], Vec::as_slice);
        Some(f(agent, neighbors))
    }

    /// Every admitted agent, in id order.
    pub fn agents(&self) -> impl Iterator<Item = &Agent<S>> {
        self.agents.values()
    }

    /// Every admitted agent, mutably, in id order.
    pub fn agents_mut(&mut self) -> impl Iterator<Item = &mut Agent<S>> {
        self.agents.values_mut()
    }

    /// Ids of every admitted agent, in order.
    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    /// Whether the board holds `id`.
    pub fn contains(&self, id: AgentId) -> bool {
        self.agents.contains_key(&id)
    }

    /// Number of admitted agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the board holds no agents.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// The sector grid, indexed `[i][j]`.
    pub fn sectors(&self) -> &[Vec<Vec<AgentId>>] {
        &self.sectors
    }

    /// Members of one sector, or `None` outside the grid.
    pub fn sector(&self, index: SectorIndex) -> Option<&[AgentId]> {
        self.sectors
            .get(index.i)
            .and_then(|column| column.get(index.j))
            .map(Vec::as_slice)
    }

    fn sector_mut(&mut self, index: SectorIndex) -> Option<&mut Vec<AgentId>> {
        self.sectors
            .get_mut(index.i)
            .and_then(|column| column.get_mut(index.j))
    }

    /// Pairs reported by the last collision check.
    pub fn collided(&self) -> &[(AgentId, AgentId)] {
        &self.collided
    }

    /// Pairs found by the last sector-pair check.
    pub fn sector_pairs(&self) -> &[(AgentId, AgentId)] {
        &self.sector_pairs
    }

    /// Neighbor cache of one agent.
    pub fn neighbors(&self, id: AgentId) -> Option<&[Neighbor]> {
        self.neighbors.get(&id).map(Vec::as_slice)
    }

    /// Agents found dead by the last dead check.
    pub fn dead(&self) -> &[AgentId] {
        &self.dead
    }
}

impl<S> fmt::Debug for Board<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("arena_size", &self.arena_size)
            .field("sector_size", &self.sector_size)
            .field("sectors_number", &self.sectors_number)
            .field("agents", &self.agents.len())
            .field("collided", &self.collided.len())
            .field("cooldowns", &self.cooldowns.len())
            .field("cooldown_policy", &self.cooldown_policy)
            .finish_non_exhaustive()
    }
}

/// Text dump of every non-empty sector, one line per sector.
impl<S> fmt::Display for Board<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Board {}x{} ({} sectors of {}x{}), {} agents",
            self.arena_size.x,
            self.arena_size.y,
            self.sectors_number,
            self.sector_size.x,
            self.sector_size.y,
            self.agents.len()
        )?;
        for (i, column) in self.sectors.iter().enumerate() {
            for (j, members) in column.iter().enumerate() {
                if members.is_empty() {
                    continue;
                }
                write!(f, "[{i}, {j}]:")?;
                for agent in members.iter().filter_map(|id| self.agents.get(id)) {
                    write!(f, " {agent}")?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Grid cell of `coordinate` along one axis, clamped to `[0, last]`.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn grid_cell(coordinate: f64, sector: f64, last: usize) -> usize {
    let cell = (coordinate / sector).floor();
    if cell.is_nan() || cell <= 0.0 {
        return 0;
    }
    // `as` saturates on overflow; the clamp below bounds the result.
    (cell as usize).min(last)
}

/// Normalize an unordered pair so the smaller id comes first.
fn ordered(a: AgentId, b: AgentId) -> (AgentId, AgentId) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn board(cooldown_ms: u64) -> Board {
        Board::new(Vec2::new(100.0, 100.0), 10, CooldownPolicy::Constant(cooldown_ms)).unwrap()
    }

    fn square(x: f64, y: f64, side: f64) -> Agent {
        Agent::new("a", Vec2::new(x, y), Vec2::new(side, side), ())
    }

    /// Every agent sits in exactly one sector, the one matching both its
    /// stored index and its position.
    fn assert_sectors_consistent(board: &Board) {
        let mut seen = BTreeSet::new();
        for (i, column) in board.sectors().iter().enumerate() {
            for (j, members) in column.iter().enumerate() {
                for id in members {
                    assert!(seen.insert(*id), "agent {id} listed twice");
                    let agent = board.agent(*id).unwrap();
                    assert_eq!(agent.sector_index(), SectorIndex::new(i, j));
                    assert_eq!(board.sector_of(agent.position()), SectorIndex::new(i, j));
                }
            }
        }
        assert_eq!(seen.len(), board.len());
    }

    // -----------------------------------------------------------------------
    // Construction and membership
    // -----------------------------------------------------------------------

    #[test]
    fn rejects_degenerate_geometry() {
        assert!(Board::<()>::new(Vec2::new(0.0, 10.0), 2, CooldownPolicy::default()).is_err());
        assert!(Board::<()>::new(Vec2::new(10.0, 10.0), 0, CooldownPolicy::default()).is_err());
        assert!(Board::<()>::new(Vec2::new(f64::NAN, 10.0), 2, CooldownPolicy::default()).is_err());
    }

    #[test]
    fn sector_size_constructor_derives_arena() {
        let board = Board::<()>::with_sector_size(Vec2::new(25.0, 10.0), 4, CooldownPolicy::default())
            .unwrap();
        assert_eq!(board.arena_size(), Vec2::new(100.0, 40.0));
        assert_eq!(board.sectors().len(), 4);
    }

    #[test]
    fn sector_of_clamps_to_grid() {
        let board = board(0);
        assert_eq!(board.sector_of(Vec2::new(0.0, 0.0)), SectorIndex::new(0, 0));
        assert_eq!(board.sector_of(Vec2::new(15.0, 99.0)), SectorIndex::new(1, 9));
        assert_eq!(board.sector_of(Vec2::new(100.0, 100.0)), SectorIndex::new(9, 9));
        assert_eq!(board.sector_of(Vec2::new(-5.0, 250.0)), SectorIndex::new(0, 9));
    }

    #[test]
    fn add_places_agent_in_its_sector() {
        let mut board = board(0);
        let id = board.add_agent(square(35.0, 72.0, 4.0)).unwrap();
        assert_eq!(board.agent(id).unwrap().sector_index(), SectorIndex::new(3, 7));
        assert_eq!(board.sector(SectorIndex::new(3, 7)).unwrap(), &[id]);
        assert_eq!(board.neighbors(id).unwrap().len(), 0);
    }

    #[test]
    fn add_clamps_into_arena() {
        let mut board = board(0);
        let id = board.add_agent(square(120.0, -3.0, 4.0)).unwrap();
        let agent = board.agent(id).unwrap();
        assert_eq!(agent.position(), Vec2::new(96.0, 0.0));
        assert!(agent.colliding_border());
        assert_sectors_consistent(&board);
    }

    #[test]
    fn add_rejects_agent_larger_than_arena() {
        let mut board = board(0);
        let err = board.add_agent(square(0.0, 0.0, 101.0)).unwrap_err();
        assert!(matches!(err, BoardError::AgentTooLarge { .. }));
        assert!(board.is_empty());
    }

    #[test]
    fn remove_is_tolerant_and_clean() {
        let mut board = board(100);
        let a = board.add_agent(square(10.0, 10.0, 4.0)).unwrap();
        let b = board.add_agent(square(12.0, 10.0, 4.0)).unwrap();
        board.check_collision();
        assert_eq!(board.cooldown(a, b), 100);

        assert!(board.remove_agent(a).is_some());
        assert!(board.remove_agent(a).is_none());
        assert_eq!(board.cooldown(a, b), 0);
        assert_eq!(board.cooldown(b, a), 0);
        assert!(board.cooldowns().is_empty());
        assert!(board.collided().is_empty());
        assert!(board.neighbors(a).is_none());
        assert_sectors_consistent(&board);
    }

    #[test]
    fn absent_ids_are_no_ops() {
        let mut board = board(0);
        let ghost = AgentId(u64::MAX);
        assert!(board.move_agent(ghost, 1.0).is_ok());
        assert!(board.move_agent_toward(ghost, Vec2::ZERO, 1.0).is_ok());
        assert!(board.scan_around_agent(ghost, 1, false).is_ok());
        assert!(board.neighbors(ghost).is_none());
    }

    // -----------------------------------------------------------------------
    // Movement
    // -----------------------------------------------------------------------

    #[test]
    fn move_transfers_between_sectors() {
        let mut board = board(0);
        let id = board
            .add_agent(square(8.0, 5.0, 2.0).with_velocity(Vec2::new(10.0, 0.0)))
            .unwrap();
        board.move_agent(id, 0.5).unwrap();

        assert_eq!(board.agent(id).unwrap().sector_index(), SectorIndex::new(1, 0));
        assert!(board.sector(SectorIndex::new(0, 0)).unwrap().is_empty());
        assert_sectors_consistent(&board);
    }

    #[test]
    fn direct_placement_is_repaired_by_the_next_move() {
        let mut board = board(0);
        let id = board.add_agent(square(9.0, 9.0, 2.0)).unwrap();
        assert_eq!(board.agent(id).unwrap().sector_index(), SectorIndex::new(0, 0));

        // A callback places the agent across a sector boundary.
        board.agent_mut(id).unwrap().move_to(Vec2::new(25.0, 9.0));
        assert_eq!(board.agent(id).unwrap().sector_index(), SectorIndex::new(0, 0));

        board.move_agents(0.0).unwrap();
        assert_eq!(board.agent(id).unwrap().sector_index(), SectorIndex::new(2, 0));
        assert_sectors_consistent(&board);
    }

    #[test]
    fn move_toward_updates_sector() {
        let mut board = board(0);
        let id = board.add_agent(square(5.0, 5.0, 2.0)).unwrap();
        board.move_agent_toward(id, Vec2::new(55.0, 5.0), 20.0).unwrap();

        let agent = board.agent(id).unwrap();
        assert!((agent.position().x - 25.0).abs() < 1e-9);
        assert_eq!(agent.sector_index(), SectorIndex::new(2, 0));
        assert_sectors_consistent(&board);
    }

    #[test]
    fn sectors_stay_consistent_under_random_motion() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut board = board(0);
        for _ in 0..40 {
            let agent = square(rng.random_range(0.0..96.0), rng.random_range(0.0..96.0), 4.0)
                .with_velocity(Vec2::new(
                    rng.random_range(-80.0..80.0),
                    rng.random_range(-80.0..80.0),
                ));
            board.add_agent(agent).unwrap();
        }
        assert_sectors_consistent(&board);

        for _ in 0..50 {
            for agent in board.agents_mut() {
                agent.accelerate_by(Vec2::new(
                    rng.random_range(-20.0..20.0),
                    rng.random_range(-20.0..20.0),
                ));
            }
            board.move_agents(rng.random_range(0.0..0.5)).unwrap();
            assert_sectors_consistent(&board);
            for agent in board.agents() {
                assert!(agent.rect().is_within(Vec2::ZERO, board.arena_size()));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Collisions
    // -----------------------------------------------------------------------

    #[test]
    fn approaching_pair_reports_once_per_cooldown() {
        let mut board = board(100);
        let a = board
            .add_agent(square(0.0, 50.0, 4.0).with_velocity(Vec2::new(50.0, 0.0)))
            .unwrap();
        let b = board
            .add_agent(square(96.0, 50.0, 4.0).with_velocity(Vec2::new(-50.0, 0.0)))
            .unwrap();

        let mut first_report = None;
        for tick in 0..200 {
            board.decrease_timeout(10);
            board.move_agents(0.01).unwrap();
            board.check_collision();
            if !board.collided().is_empty() {
                first_report = Some(tick);
                break;
            }
        }
        assert!(first_report.is_some());
        assert_eq!(board.collided(), &[ordered(a, b)]);
        assert_eq!(board.agent(a).unwrap().colliding(), Some(b));
        assert_eq!(board.agent(b).unwrap().colliding(), Some(a));

        for agent in board.agents_mut() {
            agent.stop();
        }

        board.decrease_timeout(50);
        board.check_collision();
        assert!(board.collided().is_empty());
        assert_eq!(board.agent(a).unwrap().colliding(), None);

        board.decrease_timeout(60);
        board.check_collision();
        assert_eq!(board.collided().len(), 1);
    }

    #[test]
    fn continuous_overlap_reports_at_cooldown_rate() {
        let mut board = board(100);
        board.add_agent(square(10.0, 10.0, 4.0)).unwrap();
        board.add_agent(square(11.0, 11.0, 4.0)).unwrap();

        let mut reports = 0;
        for _ in 0..30 {
            board.decrease_timeout(10);
            board.check_collision();
            reports += board.collided().len();
        }
        // Reported at ticks 0, 10 and 20.
        assert_eq!(reports, 3);
    }

    #[test]
    fn zero_cooldown_reports_every_check_once() {
        let mut board = board(0);
        board.add_agent(square(10.0, 10.0, 4.0)).unwrap();
        board.add_agent(square(11.0, 11.0, 4.0)).unwrap();
        for _ in 0..3 {
            board.check_collision();
            assert_eq!(board.collided().len(), 1);
        }
        assert!(board.cooldowns().is_empty());
    }

    #[test]
    fn finds_overlap_across_sector_boundary() {
        let mut board = board(0);
        // Straddles the x = 10 and y = 10 boundaries into sector (1, 1).
        let a = board.add_agent(square(7.0, 7.0, 5.0)).unwrap();
        let b = board.add_agent(square(11.0, 11.0, 4.0)).unwrap();
        assert_ne!(
            board.agent(a).unwrap().sector_index(),
            board.agent(b).unwrap().sector_index()
        );
        board.check_collision();
        assert_eq!(board.collided(), &[ordered(a, b)]);
    }

    #[test]
    fn finds_overlap_across_diagonal_sectors() {
        let mut board = board(0);
        // a sits in (0, 1) and b in (1, 0); neither is forward of the other.
        let a = board.add_agent(square(9.0, 11.0, 4.0)).unwrap();
        let b = board.add_agent(square(11.0, 9.0, 4.0)).unwrap();
        assert_eq!(board.agent(a).unwrap().sector_index(), SectorIndex::new(0, 1));
        assert_eq!(board.agent(b).unwrap().sector_index(), SectorIndex::new(1, 0));

        board.check_collision();
        assert_eq!(board.collided(), &[ordered(a, b)]);
    }

    #[test]
    fn touching_edges_do_not_collide() {
        let mut board = board(0);
        board.add_agent(square(10.0, 10.0, 4.0)).unwrap();
        board.add_agent(square(14.0, 10.0, 4.0)).unwrap();
        board.check_collision();
        assert!(board.collided().is_empty());
    }

    #[test]
    fn custom_cooldown_policy_arms_both_directions() {
        let mut board = Board::new(
            Vec2::new(100.0, 100.0),
            4,
            CooldownPolicy::custom(|a: &Agent<u64>, b: &Agent<u64>| a.state.max(b.state)),
        )
        .unwrap();
        let a = board
            .add_agent(Agent::new("a", Vec2::new(1.0, 1.0), Vec2::new(4.0, 4.0), 70))
            .unwrap();
        let b = board
            .add_agent(Agent::new("b", Vec2::new(2.0, 2.0), Vec2::new(4.0, 4.0), 30))
            .unwrap();
        board.check_collision();
        assert_eq!(board.cooldown(a, b), 70);
        assert_eq!(board.cooldown(b, a), 70);
    }

    // -----------------------------------------------------------------------
    // Sector pairs, deaths, pairs
    // -----------------------------------------------------------------------

    #[test]
    fn sector_pairs_cover_co_located_agents() {
        let mut board = board(0);
        board.add_agent(square(1.0, 1.0, 1.0)).unwrap();
        board.add_agent(square(5.0, 5.0, 1.0)).unwrap();
        board.add_agent(square(8.0, 2.0, 1.0)).unwrap();
        board.add_agent(square(55.0, 55.0, 1.0)).unwrap();
        board.check_sector_pairs();
        assert_eq!(board.sector_pairs().len(), 3);
    }

    #[test]
    fn check_dead_collects_without_removing() {
        let mut board = board(0);
        let a = board.add_agent(square(1.0, 1.0, 1.0)).unwrap();
        board.add_agent(square(5.0, 5.0, 1.0)).unwrap();
        board.agent_mut(a).unwrap().die();
        board.check_dead();
        assert_eq!(board.dead(), &[a]);
        assert_eq!(board.len(), 2);
    }

    #[test]
    fn pair_borrow_reaches_both_agents() {
        let mut board = board(0);
        let a = board.add_agent(square(1.0, 1.0, 1.0)).unwrap();
        let b = board.add_agent(square(5.0, 5.0, 1.0)).unwrap();
        let moved = board.with_pair_mut(a, b, |first, second| {
            first.set_name("left");
            second.set_name("right");
        });
        assert!(moved.is_some());
        assert_eq!(board.agent(a).unwrap().name(), "left");
        assert_eq!(board.agent(b).unwrap().name(), "right");
        assert!(board.with_pair_mut(a, a, |_, _| ()).is_none());
        assert_sectors_consistent(&board);
    }

    #[test]
    fn neighbor_borrow_sees_cache() {
        let (mut board, center) = scan_board();
        board.scan_around_agent(center, 1, false).unwrap();
        let count = board.with_neighbors_mut(center, |agent, neighbors| {
            agent.set_name("seen");
            neighbors.len()
        });
        assert_eq!(count, Some(2));
        assert_eq!(board.agent(center).unwrap().name(), "seen");
    }

    // -----------------------------------------------------------------------
    // Scans
    // -----------------------------------------------------------------------

    fn scan_board() -> (Board, AgentId) {
        let mut board = board(0);
        let center = board.add_agent(square(45.0, 45.0, 1.0)).unwrap();
        board.add_agent(square(46.0, 46.0, 1.0)).unwrap(); // same sector
        board.add_agent(square(55.0, 45.0, 1.0)).unwrap(); // one sector away
        board.add_agent(square(25.0, 65.0, 1.0)).unwrap(); // two sectors away
        board.add_agent(square(95.0, 95.0, 1.0)).unwrap(); // far corner
        (board, center)
    }

    #[test]
    fn scan_radius_is_monotonic() {
        let (mut board, center) = scan_board();
        let mut previous = 0;
        for (radius, expected) in [(0, 1), (1, 2), (2, 3), (4, 3), (5, 4), (50, 4)] {
            board.scan_around_agent(center, radius, false).unwrap();
            let found = board.neighbors(center).unwrap().len();
            assert_eq!(found, expected, "radius {radius}");
            assert!(found >= previous);
            previous = found;
        }
        assert!(board.neighbors(center).unwrap().iter().all(|n| n.id() != center));
    }

    #[test]
    fn scan_rejects_negative_radius() {
        let (mut board, center) = scan_board();
        let err = board.scan_around_agent(center, -1, false).unwrap_err();
        assert!(matches!(err, BoardError::NegativeRadius(-1)));
        assert!(board.scan_distances_around_agents(-3, false).is_err());
    }

    #[test]
    fn hold_previous_appends() {
        let (mut board, center) = scan_board();
        board.scan_around_agent(center, 0, false).unwrap();
        board.scan_around_agent(center, 0, true).unwrap();
        assert_eq!(board.neighbors(center).unwrap().len(), 2);
        board.scan_around_agent(center, 0, false).unwrap();
        assert_eq!(board.neighbors(center).unwrap().len(), 1);
    }

    #[test]
    fn distance_scan_measures_positions() {
        let (mut board, center) = scan_board();
        board.scan_distances_around_agents(0, false).unwrap();
        let entries = board.neighbors(center).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(matches!(
            entries[0],
            Neighbor::Distance(d) if d.from == center && (d.value - 2.0_f64.sqrt()).abs() < 1e-9
        ));
    }

    #[test]
    fn display_lists_occupied_sectors() {
        let mut board = board(0);
        board
            .add_agent(Agent::new("Red", Vec2::new(1.0, 2.0), Vec2::new(1.0, 1.0), ()))
            .unwrap();
        let text = board.to_string();
        assert!(text.starts_with("Board 100x100"));
        assert!(text.contains("[0, 0]: <Red: (1, 2)>"));
    }
}

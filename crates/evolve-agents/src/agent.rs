//! The agent entity.
//!
//! An [`Agent`] is a rectangle with a velocity, a brain, and a handful of
//! per-tick flags that the board maintains (border contact, colliding peer,
//! sector index). Simulation-specific data lives in the generic `state`
//! payload, so scenarios never need to wrap or subclass the agent.
//!
//! # Movement
//!
//! All moves go through one clamping path: the proposed position is clamped
//! per axis into `[lower, upper - size]`, and every axis that clamped adds a
//! [`BorderDirection`] tag. The board always passes the arena as the bounds,
//! which keeps every admitted agent inside the arena.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use evolve_types::{AgentId, BorderDirection, Rect, SectorIndex, Vec2, clamp};
use rand::RngCore;

use crate::brain::{Brain, Decision, NullBrain, OwnerView};
use crate::error::AgentError;
use crate::reproduction::Reproduction;

/// A simulated agent carrying a user payload `S`.
pub struct Agent<S = ()> {
    pub(crate) id: AgentId,
    name: String,
    rect: Rect,
    velocity: Vec2,
    brain: Box<dyn Brain>,
    is_dead: bool,
    colliding_border: bool,
    collision_directions: BTreeSet<BorderDirection>,
    colliding: Option<AgentId>,
    sector_index: SectorIndex,
    pub(crate) reproduction: Reproduction<S>,
    pub(crate) children: Vec<Agent<S>>,
    /// Scenario-specific data (health, mass, team, ...).
    pub state: S,
}

impl<S> Agent<S> {
    /// Create an agent with a fresh id, zero velocity, and a [`NullBrain`].
    pub fn new(name: impl Into<String>, position: Vec2, size: Vec2, state: S) -> Self {
        Self {
            id: AgentId::next(),
            name: name.into(),
            rect: Rect::new(position, size),
            velocity: Vec2::ZERO,
            brain: Box::new(NullBrain),
            is_dead: false,
            colliding_border: false,
            collision_directions: BTreeSet::new(),
            colliding: None,
            sector_index: SectorIndex::default(),
            reproduction: Reproduction::default(),
            children: Vec::new(),
            state,
        }
    }

    /// Replace the brain.
    #[must_use]
    pub fn with_brain(mut self, brain: impl Brain + 'static) -> Self {
        self.brain = Box::new(brain);
        self
    }

    /// Set the initial velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the reproduction threshold and the number of children per
    /// reproduction.
    #[must_use]
    pub fn with_reproduction(mut self, threshold: f64, count: u32) -> Self {
        self.reproduction.threshold = threshold;
        self.reproduction.count = count;
        self
    }

    /// Replace the default reproduction strategy.
    #[must_use]
    pub fn with_reproduce_fn(
        mut self,
        function: impl Fn(&Self, &mut dyn RngCore) -> Self + 'static,
    ) -> Self {
        self.reproduction.function = Some(Arc::new(function));
        self
    }

    // -------------------------------------------------------------------
    // Identity and geometry
    // -------------------------------------------------------------------

    /// The agent's stable handle.
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the agent.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Bounding rectangle.
    pub const fn rect(&self) -> &Rect {
        &self.rect
    }

    /// Top-left corner.
    pub const fn position(&self) -> Vec2 {
        self.rect.position()
    }

    /// Width and height.
    pub const fn size(&self) -> Vec2 {
        self.rect.size()
    }

    /// Resize the agent, keeping its top-left corner.
    pub const fn set_size(&mut self, size: Vec2) {
        self.rect.width = size.x;
        self.rect.height = size.y;
    }

    /// Current velocity, in arena units per second.
    pub const fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Overwrite the velocity.
    pub const fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    /// Speed (velocity magnitude).
    pub fn velocity_norm(&self) -> f64 {
        self.velocity.length()
    }

    // -------------------------------------------------------------------
    // Flags maintained by the board
    // -------------------------------------------------------------------

    /// Whether the agent has died and awaits removal.
    pub const fn is_dead(&self) -> bool {
        self.is_dead
    }

    /// Mark the agent dead. The scheduler removes it at the end of the tick.
    pub const fn die(&mut self) {
        self.is_dead = true;
    }

    /// Whether the last move clamped on at least one axis.
    pub const fn colliding_border(&self) -> bool {
        self.colliding_border
    }

    /// Borders hit by the last move.
    pub const fn collision_directions(&self) -> &BTreeSet<BorderDirection> {
        &self.collision_directions
    }

    /// The peer of the most recently reported collision this tick.
    pub const fn colliding(&self) -> Option<AgentId> {
        self.colliding
    }

    /// Record (or clear) the colliding peer. Maintained by the board.
    pub const fn set_colliding(&mut self, peer: Option<AgentId>) {
        self.colliding = peer;
    }

    /// Grid cell the agent occupies. Only meaningful while admitted.
    pub const fn sector_index(&self) -> SectorIndex {
        self.sector_index
    }

    /// Record the grid cell. Maintained by the board.
    pub const fn set_sector_index(&mut self, index: SectorIndex) {
        self.sector_index = index;
    }

    // -------------------------------------------------------------------
    // Reproduction counters
    // -------------------------------------------------------------------

    /// Current reproduction accumulator.
    pub const fn reproduce_metric(&self) -> f64 {
        self.reproduction.metric
    }

    /// Overwrite the reproduction accumulator.
    pub const fn set_reproduce_metric(&mut self, value: f64) {
        self.reproduction.metric = value;
    }

    /// Add to the reproduction accumulator.
    pub fn add_reproduce_metric(&mut self, delta: f64) {
        self.reproduction.metric += delta;
    }

    /// Accumulator value at which [`reproduce`](Self::reproduce) fires.
    pub const fn reproduce_threshold(&self) -> f64 {
        self.reproduction.threshold
    }

    /// Children produced per reproduction.
    pub const fn reproduce_count(&self) -> u32 {
        self.reproduction.count
    }

    /// Children waiting to be admitted to the board.
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Drain the pending children.
    pub fn take_children(&mut self) -> Vec<Self> {
        std::mem::take(&mut self.children)
    }

    // -------------------------------------------------------------------
    // Brain
    // -------------------------------------------------------------------

    /// The agent's decision function.
    pub fn brain(&self) -> &dyn Brain {
        self.brain.as_ref()
    }

    /// Mutable access to the decision function.
    pub fn brain_mut(&mut self) -> &mut dyn Brain {
        self.brain.as_mut()
    }

    /// Read-only view handed to the brain.
    pub const fn view(&self) -> OwnerView {
        OwnerView {
            id: self.id,
            position: self.rect.position(),
            size: self.rect.size(),
            velocity: self.velocity,
        }
    }

    /// Ask the brain for a decision on `observation`.
    pub fn decide(&self, observation: &[f64]) -> Decision {
        self.brain.decide(observation, &self.view())
    }

    // -------------------------------------------------------------------
    // Motion
    // -------------------------------------------------------------------

    /// Teleport the top-left corner to `position`. No clamping.
    pub const fn move_to(&mut self, position: Vec2) {
        self.rect.x = position.x;
        self.rect.y = position.y;
    }

    /// Add `delta` to the velocity.
    pub fn accelerate_by(&mut self, delta: Vec2) {
        self.velocity += delta;
    }

    /// Accelerate by `magnitude` toward `point`.
    ///
    /// When the agent is already within [`evolve_types::MAGNITUDE_EPSILON`] of
    /// the point it snaps onto it instead. Like [`move_to`](Self::move_to),
    /// the snap is unclamped and leaves the sector index alone: on a board,
    /// both are corrected by the next `Board::move_agent` of this agent.
    pub fn accelerate_toward(&mut self, point: Vec2, magnitude: f64) {
        match (point - self.position()).normalized() {
            Some(direction) => self.accelerate_by(direction * magnitude),
            None => self.move_to(point),
        }
    }

    /// Zero the velocity.
    pub const fn stop(&mut self) {
        self.velocity = Vec2::ZERO;
    }

    /// Advance by `velocity * dt`, clamped into `[lower, upper - size]`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidBounds`] if the bounds cannot contain
    /// the agent.
    pub fn move_by_velocity(&mut self, dt: f64, lower: Vec2, upper: Vec2) -> Result<(), AgentError> {
        let delta = self.velocity * dt;
        self.move_by(delta, lower, upper)
    }

    /// Like [`move_by_velocity`](Self::move_by_velocity), then zero the
    /// velocity.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidBounds`] if the bounds cannot contain
    /// the agent.
    pub fn move_and_reset(&mut self, dt: f64, lower: Vec2, upper: Vec2) -> Result<(), AgentError> {
        self.move_by_velocity(dt, lower, upper)?;
        self.stop();
        Ok(())
    }

    /// Move toward `point` by at most `distance`, clamped into the bounds.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidBounds`] if the bounds cannot contain
    /// the agent.
    pub fn move_toward(
        &mut self,
        point: Vec2,
        distance: f64,
        lower: Vec2,
        upper: Vec2,
    ) -> Result<(), AgentError> {
        let offset = point - self.position();
        let delta = match offset.normalized() {
            Some(direction) if offset.length() > distance => direction * distance,
            _ => offset,
        };
        self.move_by(delta, lower, upper)
    }

    /// Displace by `delta`, clamped into `[lower, upper - size]`, recording
    /// which borders were hit.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidBounds`] if the bounds cannot contain
    /// the agent.
    pub fn move_by(&mut self, delta: Vec2, lower: Vec2, upper: Vec2) -> Result<(), AgentError> {
        self.check_bounds(lower, upper)?;

        let max_x = upper.x - self.rect.width;
        let max_y = upper.y - self.rect.height;
        let (x, collide_x) = clamp(self.rect.x + delta.x, lower.x, max_x);
        let (y, collide_y) = clamp(self.rect.y + delta.y, lower.y, max_y);
        self.rect.x = x;
        self.rect.y = y;

        self.collision_directions.clear();
        self.colliding_border = collide_x || collide_y;

        if collide_x {
            if x >= max_x {
                self.collision_directions.insert(BorderDirection::Right);
            } else if x <= lower.x {
                self.collision_directions.insert(BorderDirection::Left);
            }
        }
        if collide_y {
            if y >= max_y {
                self.collision_directions.insert(BorderDirection::Down);
            } else if y <= lower.y {
                self.collision_directions.insert(BorderDirection::Up);
            }
        }

        Ok(())
    }

    fn check_bounds(&self, lower: Vec2, upper: Vec2) -> Result<(), AgentError> {
        if upper.x < self.rect.width || upper.y < self.rect.height {
            return Err(AgentError::InvalidBounds {
                reason: format!(
                    "upper bound ({}, {}) is smaller than agent size ({}, {})",
                    upper.x, upper.y, self.rect.width, self.rect.height
                ),
            });
        }
        if lower.x > upper.x - self.rect.width || lower.y > upper.y - self.rect.height {
            return Err(AgentError::InvalidBounds {
                reason: format!(
                    "lower bound ({}, {}) leaves no room below upper bound ({}, {})",
                    lower.x, lower.y, upper.x, upper.y
                ),
            });
        }
        Ok(())
    }

    /// Strict rectangle overlap with another agent.
    pub fn is_collide<T>(&self, other: &Agent<T>) -> bool {
        self.rect.overlaps(&other.rect)
    }
}

impl<S: Clone> Agent<S> {
    /// Explicit deep copy under a fresh id.
    ///
    /// The brain is deep-copied through [`Brain::box_clone`]. Per-tick
    /// state (border flags, colliding peer), pending children, and the
    /// reproduction accumulator start empty on the copy.
    pub fn new_like_me(&self) -> Self {
        let mut reproduction = self.reproduction.clone();
        reproduction.metric = 0.0;
        Self {
            id: AgentId::next(),
            name: self.name.clone(),
            rect: self.rect,
            velocity: self.velocity,
            brain: self.brain.box_clone(),
            is_dead: self.is_dead,
            colliding_border: false,
            collision_directions: BTreeSet::new(),
            colliding: None,
            sector_index: self.sector_index,
            reproduction,
            children: Vec::new(),
            state: self.state.clone(),
        }
    }
}

impl<S> fmt::Debug for Agent<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("rect", &self.rect)
            .field("velocity", &self.velocity)
            .field("is_dead", &self.is_dead)
            .field("sector_index", &self.sector_index)
            .finish_non_exhaustive()
    }
}

impl<S> fmt::Display for Agent<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}: ({}, {})>", self.name, self.rect.x, self.rect.y)
    }
}

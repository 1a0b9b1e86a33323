//! Threshold-gated reproduction.
//!
//! Every agent carries a reproduction accumulator. Simulation code feeds it
//! (wins, food, elapsed time -- whatever the scenario rewards) and calls
//! [`Agent::reproduce`]. Once the accumulator reaches the threshold, the
//! agent produces `count` children through its reproduction function and
//! the accumulator resets to zero. Children wait in [`Agent::children`]
//! until the scheduler admits them to the board.

use std::fmt;
use std::sync::Arc;

use rand::RngCore;
use tracing::debug;

use crate::agent::Agent;

/// Builds one child from a parent.
pub type ReproduceFn<S> = Arc<dyn Fn(&Agent<S>, &mut dyn RngCore) -> Agent<S>>;

/// Suffix appended to the name of children built by [`default_reproduce`].
const CHILD_NAME_SUFFIX: &str = "Child";

/// Reproduction counters and strategy for one agent.
pub struct Reproduction<S> {
    /// Accumulated progress toward the next reproduction.
    pub metric: f64,
    /// Accumulator value at which reproduction fires.
    pub threshold: f64,
    /// Number of children produced per reproduction.
    pub count: u32,
    /// Custom child builder; [`default_reproduce`] when `None`.
    pub function: Option<ReproduceFn<S>>,
}

impl<S> Reproduction<S> {
    /// Counters with the given threshold and count, using the default
    /// strategy.
    pub const fn new(threshold: f64, count: u32) -> Self {
        Self {
            metric: 0.0,
            threshold,
            count,
            function: None,
        }
    }

    /// Whether the accumulator has reached the threshold.
    pub fn is_ready(&self) -> bool {
        self.metric >= self.threshold
    }
}

impl<S> Default for Reproduction<S> {
    fn default() -> Self {
        Self::new(1.0, 1)
    }
}

impl<S> Clone for Reproduction<S> {
    fn clone(&self) -> Self {
        Self {
            metric: self.metric,
            threshold: self.threshold,
            count: self.count,
            function: self.function.clone(),
        }
    }
}

impl<S> fmt::Debug for Reproduction<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reproduction")
            .field("metric", &self.metric)
            .field("threshold", &self.threshold)
            .field("count", &self.count)
            .field("custom_function", &self.function.is_some())
            .finish()
    }
}

/// Default child builder: an independent copy of the parent with a mutated
/// brain and `Child` appended to its name.
pub fn default_reproduce<S: Clone>(parent: &Agent<S>, rng: &mut dyn RngCore) -> Agent<S> {
    let mut child = parent.new_like_me();
    child.brain_mut().mutate(rng);
    let name = format!("{}{CHILD_NAME_SUFFIX}", child.name());
    child.set_name(name);
    child
}

impl<S: Clone> Agent<S> {
    /// Produce children if the reproduction accumulator has reached its
    /// threshold.
    ///
    /// Below the threshold this is a no-op. Otherwise the reproduction
    /// function runs `count` times, each child is appended to
    /// [`children`](Agent::children), and the accumulator resets to zero.
    pub fn reproduce(&mut self, rng: &mut dyn RngCore) {
        if !self.reproduction.is_ready() {
            return;
        }

        let function = self.reproduction.function.clone();
        for _ in 0..self.reproduction.count {
            let child = match &function {
                Some(build) => build(self, rng),
                None => default_reproduce(self, rng),
            };
            self.children.push(child);
        }

        debug!(
            agent_id = %self.id,
            children = self.reproduction.count,
            pending = self.children.len(),
            "Agent reproduced"
        );
        self.reproduction.metric = 0.0;
    }
}

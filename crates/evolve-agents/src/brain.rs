//! Decision functions ("brains") and the values they produce.
//!
//! During a tick, task callbacks ask an agent for a decision by handing it
//! an observation. The [`Brain`] trait abstracts how that decision is made --
//! a scripted rule, a learned model, or a test stub. The engine never
//! inspects a brain's internals; it only forwards observations and consumes
//! the opaque [`Decision`].
//!
//! Brains are cloned explicitly through [`Brain::box_clone`]. A clone must
//! not share mutable state with its source, so mutating a child's brain
//! never changes the parent's.

use std::fmt;
use std::sync::Arc;

use evolve_types::{AgentId, Vec2};
use rand::{Rng, RngCore};

/// The output of a decision function.
///
/// The core treats this as opaque; task callbacks decide what it means
/// (a movement delta, a discrete action id, raw scores).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Decision {
    /// No decision.
    #[default]
    None,
    /// A discrete action identifier.
    Action(usize),
    /// A 2D vector, typically a movement or acceleration delta.
    Vector(Vec2),
    /// Raw output values.
    Values(Vec<f64>),
}

/// Read-only view of the agent that owns a brain, passed into
/// [`Brain::decide`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OwnerView {
    /// The owning agent.
    pub id: AgentId,
    /// Top-left corner of the owner's rectangle.
    pub position: Vec2,
    /// Size of the owner's rectangle.
    pub size: Vec2,
    /// Current velocity of the owner.
    pub velocity: Vec2,
}

/// A decision function owned by an agent.
pub trait Brain: fmt::Debug {
    /// Produce a decision for `observation` on behalf of `owner`.
    fn decide(&self, observation: &[f64], owner: &OwnerView) -> Decision;

    /// Perturb this brain in place. Brains without tunable state keep the
    /// default no-op.
    fn mutate(&mut self, _rng: &mut dyn RngCore) {}

    /// Deep-copy this brain into a new box.
    fn box_clone(&self) -> Box<dyn Brain>;
}

impl Clone for Box<dyn Brain> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// A brain that never decides anything.
///
/// Default brain for agents created without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBrain;

impl Brain for NullBrain {
    fn decide(&self, _observation: &[f64], _owner: &OwnerView) -> Decision {
        Decision::None
    }

    fn box_clone(&self) -> Box<dyn Brain> {
        Box::new(*self)
    }
}

/// Signature of the closure wrapped by [`ScriptedBrain`].
pub type DecideFn = dyn Fn(&[f64], &OwnerView) -> Decision;

/// A brain backed by a stateless closure.
///
/// Clones share the closure; since it cannot hold mutable state, parent and
/// child still evolve independently.
#[derive(Clone)]
pub struct ScriptedBrain {
    decide: Arc<DecideFn>,
}

impl ScriptedBrain {
    /// Wrap a decision closure.
    pub fn new(decide: impl Fn(&[f64], &OwnerView) -> Decision + 'static) -> Self {
        Self {
            decide: Arc::new(decide),
        }
    }
}

impl fmt::Debug for ScriptedBrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedBrain").finish_non_exhaustive()
    }
}

impl Brain for ScriptedBrain {
    fn decide(&self, observation: &[f64], owner: &OwnerView) -> Decision {
        (self.decide)(observation, owner)
    }

    fn box_clone(&self) -> Box<dyn Brain> {
        Box::new(self.clone())
    }
}

/// A single linear scoring layer followed by an argmax.
///
/// Each row of `weights` scores one output; the highest-scoring output index
/// selects an entry from `mapping`. With an empty mapping the index itself
/// is returned as [`Decision::Action`].
#[derive(Debug, Clone, PartialEq)]
pub struct LinearBrain {
    weights: Vec<Vec<f64>>,
    mapping: Vec<Decision>,
    mutation_scale: f64,
}

impl LinearBrain {
    /// Build a brain from explicit weights and an output mapping.
    pub const fn new(weights: Vec<Vec<f64>>, mapping: Vec<Decision>, mutation_scale: f64) -> Self {
        Self {
            weights,
            mapping,
            mutation_scale,
        }
    }

    /// Build a brain with `outputs × inputs` weights drawn uniformly from
    /// `[-1, 1]`.
    pub fn random(
        inputs: usize,
        outputs: usize,
        mapping: Vec<Decision>,
        mutation_scale: f64,
        rng: &mut dyn RngCore,
    ) -> Self {
        let weights = (0..outputs)
            .map(|_| (0..inputs).map(|_| rng.random_range(-1.0..=1.0)).collect())
            .collect();
        Self::new(weights, mapping, mutation_scale)
    }

    /// The weight matrix, one row per output.
    pub fn weights(&self) -> &[Vec<f64>] {
        &self.weights
    }

    /// Index of the highest-scoring output, or `None` with no outputs.
    fn argmax(&self, observation: &[f64]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, row) in self.weights.iter().enumerate() {
            let score: f64 = row.iter().zip(observation).map(|(w, x)| w * x).sum();
            match best {
                Some((_, top)) if top >= score => {}
                _ => best = Some((idx, score)),
            }
        }
        best.map(|(idx, _)| idx)
    }
}

impl Brain for LinearBrain {
    fn decide(&self, observation: &[f64], _owner: &OwnerView) -> Decision {
        let Some(idx) = self.argmax(observation) else {
            return Decision::None;
        };
        if self.mapping.is_empty() {
            return Decision::Action(idx);
        }
        self.mapping.get(idx).cloned().unwrap_or_default()
    }

    fn mutate(&mut self, rng: &mut dyn RngCore) {
        if self.mutation_scale <= 0.0 {
            return;
        }
        let scale = self.mutation_scale;
        for weight in self.weights.iter_mut().flatten() {
            *weight += rng.random_range(-scale..=scale);
        }
    }

    fn box_clone(&self) -> Box<dyn Brain> {
        Box::new(self.clone())
    }
}

//! Collision cooldowns.
//!
//! A collision is an event, not a state: two agents that keep overlapping
//! must not be reported every tick. After a pair is reported, both ordered
//! entries `(a, b)` and `(b, a)` are armed with a cooldown in simulated
//! milliseconds. The pair becomes reportable again once either entry has
//! decayed to zero.
//!
//! A missing entry is equivalent to zero, so entries are dropped as soon as
//! they reach zero and whenever one of their agents leaves the board.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use evolve_agents::Agent;
use evolve_types::AgentId;

/// Computes the cooldown for a freshly reported pair.
pub type CooldownFn<S> = Arc<dyn Fn(&Agent<S>, &Agent<S>) -> u64>;

/// How long a reported pair stays silent.
pub enum CooldownPolicy<S> {
    /// The same cooldown, in milliseconds, for every pair.
    Constant(u64),
    /// A cooldown computed from the two colliding agents.
    Custom(CooldownFn<S>),
}

impl<S> CooldownPolicy<S> {
    /// Wrap a cooldown function.
    pub fn custom(function: impl Fn(&Agent<S>, &Agent<S>) -> u64 + 'static) -> Self {
        Self::Custom(Arc::new(function))
    }

    /// Cooldown in milliseconds for the pair `(first, second)`.
    pub fn cooldown_for(&self, first: &Agent<S>, second: &Agent<S>) -> u64 {
        match self {
            Self::Constant(ms) => *ms,
            Self::Custom(function) => function(first, second),
        }
    }
}

impl<S> Default for CooldownPolicy<S> {
    fn default() -> Self {
        Self::Constant(0)
    }
}

impl<S> Clone for CooldownPolicy<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Constant(ms) => Self::Constant(*ms),
            Self::Custom(function) => Self::Custom(Arc::clone(function)),
        }
    }
}

impl<S> fmt::Debug for CooldownPolicy<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(ms) => f.debug_tuple("Constant").field(ms).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Remaining cooldown per ordered agent pair, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CooldownTable {
    entries: BTreeMap<(AgentId, AgentId), u64>,
}

impl CooldownTable {
    /// An empty table.
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Remaining cooldown for the ordered pair `(from, to)`.
    pub fn get(&self, from: AgentId, to: AgentId) -> u64 {
        self.entries.get(&(from, to)).copied().unwrap_or(0)
    }

    /// Whether the pair may be reported: either ordered entry is zero.
    pub fn is_ready(&self, a: AgentId, b: AgentId) -> bool {
        self.get(a, b) == 0 || self.get(b, a) == 0
    }

    /// Arm both ordered entries with `ms`.
    pub fn arm(&mut self, a: AgentId, b: AgentId, ms: u64) {
        if ms == 0 {
            self.entries.remove(&(a, b));
            self.entries.remove(&(b, a));
            return;
        }
        self.entries.insert((a, b), ms);
        self.entries.insert((b, a), ms);
    }

    /// Subtract `dt_ms` from every entry, saturating at zero, and drop the
    /// entries that reach zero.
    pub fn decay(&mut self, dt_ms: u64) {
        self.entries.retain(|_, remaining| {
            *remaining = remaining.saturating_sub(dt_ms);
            *remaining > 0
        });
    }

    /// Drop every entry that mentions `agent`.
    pub fn forget(&mut self, agent: AgentId) {
        self.entries.retain(|(a, b), _| *a != agent && *b != agent);
    }

    /// Number of live (non-zero) entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no pair is cooling down.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

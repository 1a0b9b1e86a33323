//! Periodic tasks and the priority-bucketed task registry.
//!
//! A task pairs a callback with a dispatch category ([`TaskKind`]), a period
//! in simulated milliseconds, a priority, and an execution limit. Each tick
//! the scheduler adds the tick delta to every task's timer; a task whose
//! timer has reached its period fires once and its timer resets to zero.
//!
//! Priorities run from [`HIGHEST_TASK_PRIORITY`] (fires first) to
//! [`LOWEST_TASK_PRIORITY`]. Within one priority, tasks fire in insertion
//! order.

use std::collections::BTreeMap;
use std::fmt;

use evolve_agents::Agent;
use evolve_types::TaskId;
use evolve_world::{Board, Neighbor};
use tracing::{debug, warn};

/// Priority of the first tasks to fire in a tick.
pub const HIGHEST_TASK_PRIORITY: u32 = 0;

/// Priority of the last tasks to fire in a tick.
pub const LOWEST_TASK_PRIORITY: u32 = 10;

/// Errors raised while building a task.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The priority is outside `HIGHEST_TASK_PRIORITY..=LOWEST_TASK_PRIORITY`.
    #[error("task priority {priority} is out of range, lowest priority is {lowest}")]
    PriorityOutOfRange {
        /// The rejected priority.
        priority: u32,
        /// The lowest allowed priority.
        lowest: u32,
    },

    /// A finite execution limit of zero would never fire.
    #[error("task execution limit must be at least 1")]
    ZeroExecutionLimit,
}

// ---------------------------------------------------------------------------
// Callback categories
// ---------------------------------------------------------------------------

/// Callback over the whole board.
pub type BoardFn<S> = Box<dyn FnMut(&mut Board<S>)>;
/// Callback over one agent and the seconds since the task last fired.
pub type AgentFn<S> = Box<dyn FnMut(&mut Agent<S>, f64)>;
/// Callback over a colliding pair and the seconds since the task last fired.
pub type CollisionPairFn<S> = Box<dyn FnMut(&mut Agent<S>, &mut Agent<S>, f64)>;
/// Callback over two agents sharing a sector.
pub type SectorPairFn<S> = Box<dyn FnMut(&mut Agent<S>, &mut Agent<S>)>;
/// Callback over one agent touching an arena border.
pub type BorderFn<S> = Box<dyn FnMut(&mut Agent<S>)>;
/// Callback over one agent, its neighbor cache, and the seconds since the
/// task last fired.
pub type NeighborFn<S> = Box<dyn FnMut(&mut Agent<S>, &[Neighbor], f64)>;

/// What a task is invoked on when it fires.
pub enum TaskKind<S> {
    /// Once per firing, with the board.
    Global(BoardFn<S>),
    /// Once per live agent.
    Agent(AgentFn<S>),
    /// Once per live colliding pair from the last collision check.
    CollisionPair(CollisionPairFn<S>),
    /// Once per live pair from the last sector-pair check.
    SectorPair(SectorPairFn<S>),
    /// Once per live agent whose last move hit a border.
    BorderCollision(BorderFn<S>),
    /// Once per live agent with a non-empty neighbor cache.
    NeighborScan(NeighborFn<S>),
    /// Once per firing, with the board, after every other task this tick.
    FrameEnd(BoardFn<S>),
}

impl<S> TaskKind<S> {
    /// Board-wide callback.
    pub fn global(f: impl FnMut(&mut Board<S>) + 'static) -> Self {
        Self::Global(Box::new(f))
    }

    /// Per-agent callback.
    pub fn agent(f: impl FnMut(&mut Agent<S>, f64) + 'static) -> Self {
        Self::Agent(Box::new(f))
    }

    /// Per-colliding-pair callback.
    pub fn collision_pair(f: impl FnMut(&mut Agent<S>, &mut Agent<S>, f64) + 'static) -> Self {
        Self::CollisionPair(Box::new(f))
    }

    /// Per-sector-pair callback.
    pub fn sector_pair(f: impl FnMut(&mut Agent<S>, &mut Agent<S>) + 'static) -> Self {
        Self::SectorPair(Box::new(f))
    }

    /// Per-border-collision callback.
    pub fn border_collision(f: impl FnMut(&mut Agent<S>) + 'static) -> Self {
        Self::BorderCollision(Box::new(f))
    }

    /// Per-agent neighbor callback.
    pub fn neighbor_scan(f: impl FnMut(&mut Agent<S>, &[Neighbor], f64) + 'static) -> Self {
        Self::NeighborScan(Box::new(f))
    }

    /// End-of-tick board-wide callback.
    pub fn frame_end(f: impl FnMut(&mut Board<S>) + 'static) -> Self {
        Self::FrameEnd(Box::new(f))
    }

    /// Short name of the category, for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Global(_) => "global",
            Self::Agent(_) => "agent",
            Self::CollisionPair(_) => "collision_pair",
            Self::SectorPair(_) => "sector_pair",
            Self::BorderCollision(_) => "border_collision",
            Self::NeighborScan(_) => "neighbor_scan",
            Self::FrameEnd(_) => "frame_end",
        }
    }

    /// Whether this category runs in the end-of-tick phase.
    pub const fn is_frame_end(&self) -> bool {
        matches!(self, Self::FrameEnd(_))
    }
}

impl<S> fmt::Debug for TaskKind<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// How many more times a task may fire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionLimit {
    /// Fires forever.
    #[default]
    Unlimited,
    /// Fires this many more times.
    Remaining(u64),
}

impl ExecutionLimit {
    /// Whether the limit has been used up.
    pub const fn is_exhausted(self) -> bool {
        matches!(self, Self::Remaining(0))
    }
}

/// A periodic callback.
pub struct Task<S> {
    id: TaskId,
    label: Option<String>,
    kind: TaskKind<S>,
    period_ms: u64,
    timer_ms: u64,
    priority: u32,
    limit: ExecutionLimit,
}

impl<S> Task<S> {
    /// A task firing every `period_ms` simulated milliseconds at the given
    /// priority, with no execution limit. A zero period fires every tick.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::PriorityOutOfRange`] if `priority` exceeds
    /// [`LOWEST_TASK_PRIORITY`].
    pub fn new(kind: TaskKind<S>, period_ms: u64, priority: u32) -> Result<Self, TaskError> {
        if priority > LOWEST_TASK_PRIORITY {
            return Err(TaskError::PriorityOutOfRange {
                priority,
                lowest: LOWEST_TASK_PRIORITY,
            });
        }
        Ok(Self {
            id: TaskId::next(),
            label: None,
            kind,
            period_ms,
            timer_ms: 0,
            priority,
            limit: ExecutionLimit::Unlimited,
        })
    }

    /// Limit the task to `times` firings; it is removed at the end of the
    /// tick in which it fires for the last time.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::ZeroExecutionLimit`] if `times` is zero.
    pub fn with_limit(mut self, times: u64) -> Result<Self, TaskError> {
        if times == 0 {
            return Err(TaskError::ZeroExecutionLimit);
        }
        self.limit = ExecutionLimit::Remaining(times);
        Ok(self)
    }

    /// Attach a label shown in logs.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Unique task id.
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Optional label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The dispatch category.
    pub const fn kind(&self) -> &TaskKind<S> {
        &self.kind
    }

    /// Firing period in simulated milliseconds.
    pub const fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Milliseconds accumulated since the task last fired.
    pub const fn timer_ms(&self) -> u64 {
        self.timer_ms
    }

    /// Priority bucket.
    pub const fn priority(&self) -> u32 {
        self.priority
    }

    /// Remaining execution budget.
    pub const fn limit(&self) -> ExecutionLimit {
        self.limit
    }

    /// Whether the task has used up its execution limit.
    pub const fn is_exhausted(&self) -> bool {
        self.limit.is_exhausted()
    }

    /// Add `delta_ms` to the timer. Returns whether the task is due.
    pub(crate) const fn accumulate(&mut self, delta_ms: u64) -> bool {
        self.timer_ms = self.timer_ms.saturating_add(delta_ms);
        !self.is_exhausted() && self.timer_ms >= self.period_ms
    }

    /// Fire against `board`, then reset the timer and spend one execution.
    ///
    /// Dead agents, and pairs containing one, are skipped.
    pub(crate) fn fire(&mut self, board: &mut Board<S>) {
        let elapsed = crate::clock::ms_to_seconds(self.timer_ms);

        match &mut self.kind {
            TaskKind::Global(f) | TaskKind::FrameEnd(f) => f(board),
            TaskKind::Agent(f) => {
                for agent in board.agents_mut().filter(|agent| !agent.is_dead()) {
                    f(agent, elapsed);
                }
            }
            TaskKind::CollisionPair(f) => {
                for (a, b) in board.collided().to_vec() {
                    board.with_pair_mut(a, b, |first, second| {
                        if !first.is_dead() && !second.is_dead() {
                            f(first, second, elapsed);
                        }
                    });
                }
            }
            TaskKind::SectorPair(f) => {
                for (a, b) in board.sector_pairs().to_vec() {
                    board.with_pair_mut(a, b, |first, second| {
                        if !first.is_dead() && !second.is_dead() {
                            f(first, second);
                        }
                    });
                }
            }
            TaskKind::BorderCollision(f) => {
                for agent in board
                    .agents_mut()
                    .filter(|agent| !agent.is_dead() && agent.colliding_border())
                {
                    f(agent);
                }
            }
            TaskKind::NeighborScan(f) => {
                for id in board.agent_ids() {
                    board.with_neighbors_mut(id, |agent, neighbors| {
                        if !agent.is_dead() && !neighbors.is_empty() {
                            f(agent, neighbors, elapsed);
                        }
                    });
                }
            }
        }

        self.timer_ms = 0;
        if let ExecutionLimit::Remaining(remaining) = &mut self.limit {
            *remaining = remaining.saturating_sub(1);
        }
    }
}

impl<S> fmt::Debug for Task<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("period_ms", &self.period_ms)
            .field("timer_ms", &self.timer_ms)
            .field("priority", &self.priority)
            .field("limit", &self.limit)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Tasks bucketed by priority, insertion-ordered within a bucket.
pub struct TaskRegistry<S> {
    buckets: BTreeMap<u32, Vec<Task<S>>>,
}

impl<S> TaskRegistry<S> {
    /// An empty registry.
    pub const fn new() -> Self {
        Self {
            buckets: BTreeMap::new(),
        }
    }

    /// Register a task. Returns its id.
    pub fn insert(&mut self, task: Task<S>) -> TaskId {
        let id = task.id();
        debug!(
            task_id = %id,
            label = task.label(),
            kind = task.kind().name(),
            priority = task.priority(),
            period_ms = task.period_ms(),
            "Task registered"
        );
        self.buckets.entry(task.priority()).or_default().push(task);
        id
    }

    /// Unregister a task. Unknown ids log a warning and return `None`.
    pub fn remove(&mut self, id: TaskId) -> Option<Task<S>> {
        for bucket in self.buckets.values_mut() {
            if let Some(position) = bucket.iter().position(|task| task.id() == id) {
                return Some(bucket.remove(position));
            }
        }
        warn!(task_id = %id, "Cannot remove task, it is not registered");
        None
    }

    /// Look up a task.
    pub fn get(&self, id: TaskId) -> Option<&Task<S>> {
        self.iter().find(|task| task.id() == id)
    }

    /// Whether a task is registered.
    pub fn contains(&self, id: TaskId) -> bool {
        self.get(id).is_some()
    }

    /// Every task, highest priority first.
    pub fn iter(&self) -> impl Iterator<Item = &Task<S>> {
        self.buckets.values().flatten()
    }

    /// Every task mutably, highest priority first.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Task<S>> {
        self.buckets.values_mut().flatten()
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Whether no task is registered.
    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(Vec::is_empty)
    }

    /// Drop every exhausted task. Returns how many were dropped.
    pub fn reap_exhausted(&mut self) -> usize {
        let mut reaped: usize = 0;
        for bucket in self.buckets.values_mut() {
            let before = bucket.len();
            bucket.retain(|task| !task.is_exhausted());
            reaped = reaped.saturating_add(before.saturating_sub(bucket.len()));
        }
        self.buckets.retain(|_, bucket| !bucket.is_empty());
        reaped
    }
}

impl<S> Default for TaskRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for TaskRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use evolve_types::Vec2;
    use evolve_world::CooldownPolicy;

    use super::*;

    fn noop() -> TaskKind<()> {
        TaskKind::global(|_| {})
    }

    fn board() -> Board {
        Board::new(Vec2::new(100.0, 100.0), 4, CooldownPolicy::Constant(0)).unwrap()
    }

    #[test]
    fn priority_is_validated() {
        assert!(Task::new(noop(), 0, LOWEST_TASK_PRIORITY).is_ok());
        let err = Task::new(noop(), 0, LOWEST_TASK_PRIORITY + 1).unwrap_err();
        assert!(matches!(err, TaskError::PriorityOutOfRange { priority: 11, .. }));
    }

    #[test]
    fn zero_limit_is_rejected() {
        let err = Task::new(noop(), 0, 0).unwrap().with_limit(0).unwrap_err();
        assert!(matches!(err, TaskError::ZeroExecutionLimit));
    }

    #[test]
    fn timer_accumulates_until_period() {
        let mut task = Task::new(noop(), 30, 0).unwrap();
        assert!(!task.accumulate(10));
        assert!(!task.accumulate(10));
        assert!(task.accumulate(10));
        task.fire(&mut board());
        assert_eq!(task.timer_ms(), 0);
    }

    #[test]
    fn limited_task_exhausts() {
        let mut board = board();
        let mut task = Task::new(noop(), 0, 0).unwrap().with_limit(2).unwrap();
        assert!(task.accumulate(1));
        task.fire(&mut board);
        assert_eq!(task.limit(), ExecutionLimit::Remaining(1));
        assert!(task.accumulate(1));
        task.fire(&mut board);
        assert!(task.is_exhausted());
        assert!(!task.accumulate(1));
    }

    #[test]
    fn agent_callback_sees_elapsed_seconds_and_skips_dead() {
        let mut board = board();
        let alive = board
            .add_agent(Agent::new("a", Vec2::ZERO, Vec2::new(1.0, 1.0), ()))
            .unwrap();
        let dead = board
            .add_agent(Agent::new("b", Vec2::new(50.0, 50.0), Vec2::new(1.0, 1.0), ()))
            .unwrap();
        board.agent_mut(dead).unwrap().die();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut task = Task::new(
            TaskKind::agent(move |agent: &mut Agent, elapsed| {
                sink.borrow_mut().push((agent.id(), elapsed));
            }),
            500,
            0,
        )
        .unwrap();
        assert!(task.accumulate(500));
        task.fire(&mut board);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, alive);
        assert!((seen[0].1 - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn registry_orders_by_priority_then_insertion() {
        let mut registry = TaskRegistry::new();
        let late = registry.insert(Task::new(noop(), 0, 5).unwrap());
        let first = registry.insert(Task::new(noop(), 0, 0).unwrap());
        let second = registry.insert(Task::new(noop(), 0, 0).unwrap());

        let order: Vec<TaskId> = registry.iter().map(Task::id).collect();
        assert_eq!(order, vec![first, second, late]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn removing_unknown_task_returns_none() {
        let mut registry: TaskRegistry<()> = TaskRegistry::new();
        let id = registry.insert(Task::new(noop(), 0, 3).unwrap());
        assert!(registry.remove(id).is_some());
        assert!(registry.remove(id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn reap_drops_only_exhausted() {
        let mut board = board();
        let mut registry = TaskRegistry::new();
        let once = registry.insert(Task::new(noop(), 0, 0).unwrap().with_limit(1).unwrap());
        let forever = registry.insert(Task::new(noop(), 0, 0).unwrap());
        for task in registry.iter_mut() {
            if task.accumulate(1) {
                task.fire(&mut board);
            }
        }
        assert_eq!(registry.reap_exhausted(), 1);
        assert!(!registry.contains(once));
        assert!(registry.contains(forever));
    }
}

//! The tick cycle.
//!
//! Each call to [`Scheduler::tick`] runs these phases in order:
//!
//! 1. **Clock** -- advance the tick counter and simulated time.
//! 2. **Board** -- decay collision cooldowns, move every agent by its
//!    velocity, then rebuild the enabled caches (collisions, sector pairs,
//!    neighbor scan).
//! 3. **Dispatch** -- walk every non-frame-end task by priority; due tasks
//!    fire against the board.
//! 4. **Frame end** -- the same walk over frame-end tasks.
//! 5. **Cleanup** -- remove dead agents, admit the children of the
//!    survivors, and drop tasks whose execution limit is used up.
//!
//! Removals are deferred to the cleanup phase so no task ever sees an
//! agent or task disappear mid-dispatch.

use evolve_types::TaskId;
use evolve_world::{Board, BoardError, CooldownPolicy};
use serde::Serialize;
use tracing::{debug, info};

use crate::clock::{ClockError, SimClock, ms_to_seconds};
use crate::config::{BoardChecksConfig, ConfigError, SimulationConfig};
use crate::task::{Task, TaskRegistry};

/// Errors that can occur while running a tick.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// A board operation failed.
    #[error("board error: {source}")]
    Board {
        /// The underlying board error.
        #[from]
        source: BoardError,
    },

    /// The clock could not advance.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// The configuration is unusable.
    #[error("config error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Simulated milliseconds elapsed at the end of the tick.
    pub time_ms: u64,
    /// Agents on the board at the end of the tick.
    pub agents_alive: usize,
    /// Pairs reported by this tick's collision check.
    pub collisions: usize,
    /// Dead agents removed during cleanup.
    pub deaths: usize,
    /// Children admitted during cleanup.
    pub births: usize,
    /// Tasks that fired.
    pub tasks_fired: usize,
    /// Exhausted tasks dropped during cleanup.
    pub tasks_reaped: usize,
}

/// Owner of the board, the clock, and the task registry.
#[derive(Debug)]
pub struct Scheduler<S = ()> {
    board: Board<S>,
    clock: SimClock,
    tasks: TaskRegistry<S>,
    checks: BoardChecksConfig,
    scan_radius: i64,
}

impl<S> Scheduler<S> {
    /// A scheduler over an existing board.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Clock`] for a zero tick delta.
    pub fn new(
        board: Board<S>,
        tick_delta_ms: u64,
        checks: BoardChecksConfig,
        scan_radius: i64,
    ) -> Result<Self, SchedulerError> {
        if scan_radius < 0 {
            return Err(BoardError::NegativeRadius(scan_radius).into());
        }
        Ok(Self {
            board,
            clock: SimClock::new(tick_delta_ms)?,
            tasks: TaskRegistry::new(),
            checks,
            scan_radius,
        })
    }

    /// Build the board and scheduler described by `config`, with a
    /// constant collision cooldown taken from the config.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Config`] if the config does not validate,
    /// or the board/clock error for geometry they reject.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, SchedulerError> {
        let policy = CooldownPolicy::Constant(config.board.collision_cooldown_ms);
        Self::from_config_with_policy(config, policy)
    }

    /// Like [`Scheduler::from_config`] with an explicit cooldown policy.
    ///
    /// # Errors
    ///
    /// Same as [`Scheduler::from_config`].
    pub fn from_config_with_policy(
        config: &SimulationConfig,
        policy: CooldownPolicy<S>,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;
        let arena = evolve_types::Vec2::new(config.board.arena_width, config.board.arena_height);
        let board = Board::new(arena, config.board.sectors_number, policy)?;
        Self::new(
            board,
            config.world.tick_delta_ms,
            config.board.checks,
            config.board.scan_radius,
        )
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The board.
    pub const fn board(&self) -> &Board<S> {
        &self.board
    }

    /// The board, mutably (setup and tests).
    pub const fn board_mut(&mut self) -> &mut Board<S> {
        &mut self.board
    }

    /// The clock.
    pub const fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// The task registry.
    pub const fn tasks(&self) -> &TaskRegistry<S> {
        &self.tasks
    }

    /// Which board checks run each tick.
    pub const fn checks(&self) -> BoardChecksConfig {
        self.checks
    }

    /// Enable or disable board checks.
    pub const fn set_checks(&mut self, checks: BoardChecksConfig) {
        self.checks = checks;
    }

    /// Register a task. Returns its id.
    pub fn add_task(&mut self, task: Task<S>) -> TaskId {
        self.tasks.insert(task)
    }

    /// Register several tasks. Returns their ids in order.
    pub fn add_tasks(&mut self, tasks: impl IntoIterator<Item = Task<S>>) -> Vec<TaskId> {
        tasks.into_iter().map(|task| self.tasks.insert(task)).collect()
    }

    /// Unregister a task. Unknown ids log a warning and return `None`.
    pub fn remove_task(&mut self, id: TaskId) -> Option<Task<S>> {
        self.tasks.remove(id)
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Run one tick with the configured fixed step.
    ///
    /// # Errors
    ///
    /// See [`Scheduler::tick_with`].
    pub fn tick(&mut self) -> Result<TickSummary, SchedulerError> {
        self.tick_with(self.clock.delta_ms())
    }

    /// Run one tick covering `delta_ms` simulated milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Clock`] if the clock overflows, or
    /// [`SchedulerError::Board`] if an agent can no longer move inside the
    /// arena or a child cannot be admitted. Callback panics are not caught.
    pub fn tick_with(&mut self, delta_ms: u64) -> Result<TickSummary, SchedulerError> {
        // --- Phase 1: Clock ---
        let tick = self.clock.advance(delta_ms)?;

        // --- Phase 2: Board ---
        let collisions = self.recompute_board(delta_ms)?;

        // --- Phases 3 & 4: Dispatch, then frame end ---
        let fired = self
            .dispatch(delta_ms, false)
            .saturating_add(self.dispatch(delta_ms, true));

        // --- Phase 5: Cleanup ---
        let deaths = self.reap_dead();
        let births = self.admit_children()?;
        let tasks_reaped = self.tasks.reap_exhausted();

        let summary = TickSummary {
            tick,
            time_ms: self.clock.elapsed_ms(),
            agents_alive: self.board.len(),
            collisions,
            deaths,
            births,
            tasks_fired: fired,
            tasks_reaped,
        };
        debug!(
            tick,
            agents = summary.agents_alive,
            collisions,
            deaths,
            births,
            tasks_fired = fired,
            "Tick complete"
        );
        Ok(summary)
    }

    fn recompute_board(&mut self, delta_ms: u64) -> Result<usize, SchedulerError> {
        self.board.decrease_timeout(delta_ms);
        self.board.move_agents(ms_to_seconds(delta_ms))?;

        if self.checks.collision {
            self.board.check_collision();
        }
        if self.checks.sector_pairs {
            self.board.check_sector_pairs();
        }
        if self.checks.neighbors {
            self.board.scan_around_agents(self.scan_radius, false)?;
        }
        Ok(if self.checks.collision {
            self.board.collided().len()
        } else {
            0
        })
    }

    /// Accumulate and fire every task of one phase. Returns how many fired.
    fn dispatch(&mut self, delta_ms: u64, frame_end: bool) -> usize {
        let mut fired: usize = 0;
        for task in self
            .tasks
            .iter_mut()
            .filter(|task| task.kind().is_frame_end() == frame_end)
        {
            if task.accumulate(delta_ms) {
                task.fire(&mut self.board);
                fired = fired.saturating_add(1);
            }
        }
        fired
    }

    fn reap_dead(&mut self) -> usize {
        self.board.check_dead();
        let dead = self.board.dead().to_vec();
        for id in &dead {
            self.board.remove_agent(*id);
        }
        if !dead.is_empty() {
            info!(tick = self.clock.tick(), count = dead.len(), "Dead agents removed");
        }
        dead.len()
    }

    fn admit_children(&mut self) -> Result<usize, SchedulerError> {
        let children: Vec<_> = self
            .board
            .agents_mut()
            .flat_map(evolve_agents::Agent::take_children)
            .collect();
        let births = children.len();
        self.board.add_agents(children)?;
        if births > 0 {
            info!(tick = self.clock.tick(), count = births, "Children admitted");
        }
        Ok(births)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use evolve_agents::Agent;
    use evolve_types::Vec2;

    use super::*;
    use crate::task::TaskKind;

    fn scheduler() -> Scheduler {
        let board = Board::new(Vec2::new(100.0, 100.0), 10, CooldownPolicy::Constant(100)).unwrap();
        Scheduler::new(board, 10, BoardChecksConfig::default(), 1).unwrap()
    }

    #[test]
    fn from_default_config() {
        let scheduler: Scheduler = Scheduler::from_config(&SimulationConfig::default()).unwrap();
        assert_eq!(scheduler.clock().delta_ms(), 16);
        assert_eq!(scheduler.board().sectors_number(), 8);
    }

    #[test]
    fn from_invalid_config_fails() {
        let mut config = SimulationConfig::default();
        config.board.sectors_number = 0;
        let result: Result<Scheduler, _> = Scheduler::from_config(&config);
        assert!(matches!(result, Err(SchedulerError::Config { .. })));
    }

    #[test]
    fn negative_scan_radius_is_rejected() {
        let board = Board::<()>::new(Vec2::new(10.0, 10.0), 1, CooldownPolicy::default()).unwrap();
        assert!(Scheduler::new(board, 10, BoardChecksConfig::default(), -2).is_err());
    }

    #[test]
    fn tick_advances_clock_and_moves_agents() {
        let mut scheduler = scheduler();
        let id = scheduler
            .board_mut()
            .add_agent(
                Agent::new("a", Vec2::new(10.0, 10.0), Vec2::new(2.0, 2.0), ())
                    .with_velocity(Vec2::new(100.0, 0.0)),
            )
            .unwrap();

        let summary = scheduler.tick().unwrap();
        assert_eq!(summary.tick, 1);
        assert_eq!(summary.time_ms, 10);
        assert_eq!(summary.agents_alive, 1);
        let x = scheduler.board().agent(id).unwrap().position().x;
        assert!((x - 11.0).abs() < 1e-9);
    }

    #[test]
    fn removing_unknown_task_is_tolerated() {
        let mut scheduler = scheduler();
        let id = scheduler.add_task(Task::new(TaskKind::global(|_| {}), 0, 0).unwrap());
        assert!(scheduler.remove_task(id).is_some());
        assert!(scheduler.remove_task(id).is_none());
    }
}

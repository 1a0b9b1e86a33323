//! Bounded simulation loop.
//!
//! [`run_simulation`] drives [`Scheduler::tick`] until a stop condition is
//! met:
//!
//! - **Tick limit**: stop after `max_ticks` ticks (0 = unlimited)
//! - **Extinction**: stop when the board is empty after a tick
//!
//! Between ticks the loop optionally sleeps for `tick_interval_ms` of real
//! time so a viewer can follow along. The sleep is the only await point;
//! ticks themselves never yield.

use evolve_world::Board;
use tracing::{info, warn};

use crate::config::SimulationConfig;
use crate::scheduler::{Scheduler, SchedulerError, TickSummary};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying scheduler error.
        #[from]
        source: SchedulerError,
    },
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationEndReason {
    /// Reached the configured `max_ticks` limit.
    MaxTicksReached,
    /// No agents are left on the board.
    Extinction,
}

/// Stop conditions and pacing for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunBounds {
    /// Maximum number of ticks (0 = unlimited).
    pub max_ticks: u64,
    /// Real-time milliseconds to sleep between ticks (0 = no sleep).
    pub tick_interval_ms: u64,
}

impl RunBounds {
    /// Bounds taken from `simulation.max_ticks` and `world.tick_interval_ms`.
    pub const fn from_config(config: &SimulationConfig) -> Self {
        Self {
            max_ticks: config.simulation.max_ticks,
            tick_interval_ms: config.world.tick_interval_ms,
        }
    }

    fn tick_limit_reached(self, ticks: u64) -> bool {
        self.max_ticks > 0 && ticks >= self.max_ticks
    }
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Total number of ticks executed.
    pub total_ticks: u64,
}

/// Callback invoked after each tick completes.
///
/// This is the seam for rendering and export: the callback gets read-only
/// access to the board between ticks.
pub trait TickCallback<S> {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, board: &Board<S>);
}

/// A no-op tick callback.
pub struct NoOpCallback;

impl<S> TickCallback<S> for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _board: &Board<S>) {}
}

/// Run the tick loop until a stop condition is met.
///
/// # Errors
///
/// Returns [`RunnerError`] if a tick fails.
pub async fn run_simulation<S>(
    scheduler: &mut Scheduler<S>,
    bounds: RunBounds,
    callback: &mut dyn TickCallback<S>,
) -> Result<SimulationResult, RunnerError> {
    let mut total_ticks: u64 = 0;

    info!(
        max_ticks = bounds.max_ticks,
        tick_interval_ms = bounds.tick_interval_ms,
        agents = scheduler.board().len(),
        tasks = scheduler.tasks().len(),
        "Simulation starting"
    );

    loop {
        // --- Execute tick ---
        let summary = scheduler.tick()?;
        total_ticks = total_ticks.saturating_add(1);

        // --- Notify callback ---
        callback.on_tick(&summary, scheduler.board());

        // --- Check extinction ---
        if summary.agents_alive == 0 {
            info!(tick = summary.tick, "No agents left -- extinction");
            return Ok(SimulationResult {
                end_reason: SimulationEndReason::Extinction,
                final_summary: Some(summary),
                total_ticks,
            });
        }

        // --- Check tick limit ---
        if bounds.tick_limit_reached(total_ticks) {
            info!(
                tick = summary.tick,
                max_ticks = bounds.max_ticks,
                "Tick limit reached"
            );
            return Ok(SimulationResult {
                end_reason: SimulationEndReason::MaxTicksReached,
                final_summary: Some(summary),
                total_ticks,
            });
        }

        // --- Sleep for tick interval ---
        if bounds.tick_interval_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(bounds.tick_interval_ms)).await;
        }
    }
}

/// Log how a run ended.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        final_agents_alive = result.final_summary.as_ref().map(|s| s.agents_alive),
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            time_ms = summary.time_ms,
            agents_alive = summary.agents_alive,
            collisions = summary.collisions,
            "Final tick summary"
        );
    } else {
        warn!("Simulation ended with no ticks executed");
    }
}

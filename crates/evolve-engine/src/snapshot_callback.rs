//! Tick callback that logs board snapshots.
//!
//! Every tick is traced at `debug`. Every `interval_ticks` ticks the whole
//! board is serialized to JSON and logged at `info`, which gives an
//! external viewer enough to replay the run from the log alone.

use evolve_core::runner::TickCallback;
use evolve_core::scheduler::TickSummary;
use evolve_world::{Board, BoardSnapshot};
use tracing::{debug, info, warn};

/// Callback that emits periodic JSON snapshots of the board.
pub struct SnapshotCallback {
    interval_ticks: u64,
    emitted: u64,
}

impl SnapshotCallback {
    /// Snapshot every `interval_ticks` ticks (0 = never).
    pub const fn new(interval_ticks: u64) -> Self {
        Self {
            interval_ticks,
            emitted: 0,
        }
    }

    /// Number of snapshots logged so far.
    pub const fn emitted(&self) -> u64 {
        self.emitted
    }

    fn is_due(&self, tick: u64) -> bool {
        tick.checked_rem(self.interval_ticks) == Some(0)
    }
}

impl<S> TickCallback<S> for SnapshotCallback {
    fn on_tick(&mut self, summary: &TickSummary, board: &Board<S>) {
        debug!(
            tick = summary.tick,
            agents = summary.agents_alive,
            collisions = summary.collisions,
            "Tick observed"
        );

        if !self.is_due(summary.tick) {
            return;
        }
        match serde_json::to_string(&BoardSnapshot::from(board)) {
            Ok(json) => {
                self.emitted = self.emitted.saturating_add(1);
                info!(tick = summary.tick, snapshot = %json, "Board snapshot");
            }
            Err(err) => warn!(tick = summary.tick, %err, "Board snapshot failed"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use evolve_agents::Agent;
    use evolve_types::Vec2;
    use evolve_world::CooldownPolicy;

    use super::*;

    fn summary(tick: u64) -> TickSummary {
        TickSummary {
            tick,
            ..TickSummary::default()
        }
    }

    #[test]
    fn snapshots_follow_the_interval() {
        let mut board = Board::new(Vec2::new(10.0, 10.0), 2, CooldownPolicy::default()).unwrap();
        board
            .add_agent(Agent::new("a", Vec2::ZERO, Vec2::new(1.0, 1.0), ()))
            .unwrap();

        let mut callback = SnapshotCallback::new(3);
        for tick in 1..=7 {
            callback.on_tick(&summary(tick), &board);
        }
        assert_eq!(callback.emitted(), 2);
    }

    #[test]
    fn zero_interval_never_snapshots() {
        let board = Board::<()>::new(Vec2::new(10.0, 10.0), 1, CooldownPolicy::default()).unwrap();
        let mut callback = SnapshotCallback::new(0);
        for tick in 1..=5 {
            callback.on_tick(&summary(tick), &board);
        }
        assert_eq!(callback.emitted(), 0);
    }
}

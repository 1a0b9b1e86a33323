//! Simulation clock.
//!
//! The clock counts completed ticks and the simulated milliseconds they
//! covered. It has no connection to wall time: a tick advances the clock by
//! whatever delta the scheduler was given, so runs replay identically.
//!
//! All arithmetic is checked; running past `u64::MAX` is an error rather
//! than a silent wrap.

/// Milliseconds per second, for converting deltas to callback seconds.
const MS_PER_SECOND: f64 = 1000.0;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,

    /// Simulated time would overflow.
    #[error("simulated time overflow: cannot advance beyond u64::MAX ms")]
    TimeOverflow,

    /// The fixed step is unusable.
    #[error("invalid clock configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// Tick counter plus accumulated simulated time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimClock {
    /// Number of completed ticks.
    tick: u64,
    /// Simulated milliseconds elapsed across all ticks.
    elapsed_ms: u64,
    /// Delta applied by a fixed-step tick.
    delta_ms: u64,
}

impl SimClock {
    /// A clock at tick 0 with the given fixed step.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] for a zero step.
    pub fn new(delta_ms: u64) -> Result<Self, ClockError> {
        Self::from_parts(0, 0, delta_ms)
    }

    /// Rebuild a clock from explicit state.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] for a zero step.
    pub fn from_parts(tick: u64, elapsed_ms: u64, delta_ms: u64) -> Result<Self, ClockError> {
        if delta_ms == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "tick delta must be at least 1 ms".to_owned(),
            });
        }
        Ok(Self {
            tick,
            elapsed_ms,
            delta_ms,
        })
    }

    /// Advance by one tick covering `delta_ms`. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] or [`ClockError::TimeOverflow`]
    /// if either counter would exceed `u64::MAX`. The clock is unchanged on
    /// error.
    pub fn advance(&mut self, delta_ms: u64) -> Result<u64, ClockError> {
        let tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        let elapsed_ms = self
            .elapsed_ms
            .checked_add(delta_ms)
            .ok_or(ClockError::TimeOverflow)?;
        self.tick = tick;
        self.elapsed_ms = elapsed_ms;
        Ok(tick)
    }

    /// Number of completed ticks.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated milliseconds elapsed.
    pub const fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// The fixed step in milliseconds.
    pub const fn delta_ms(&self) -> u64 {
        self.delta_ms
    }
}

/// Convert milliseconds to the seconds handed to callbacks.
#[allow(clippy::cast_precision_loss)]
pub fn ms_to_seconds(ms: u64) -> f64 {
    // Exact up to 2^53 ms, far beyond any realistic run.
    ms as f64 / MS_PER_SECOND
}

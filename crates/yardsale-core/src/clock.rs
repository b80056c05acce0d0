//! Simulation clock.
//!
//! The tick counter is the only temporal state in the simulation. The
//! snapshot cadence (the dashboards redrew their charts every few ticks
//! rather than on every one) is derived from it, never stored separately.
//!
//! All arithmetic is checked; the counter refuses to wrap.

use std::num::NonZeroU64;

/// Errors that can occur during clock operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,
}

/// Counts completed ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationClock {
    /// Number of completed ticks. Tick 0 is the initial state.
    tick: u64,

    /// Ticks between snapshots.
    snapshot_interval: NonZeroU64,
}

impl SimulationClock {
    /// A clock at tick 0.
    pub const fn new(snapshot_interval: NonZeroU64) -> Self {
        Self {
            tick: 0,
            snapshot_interval,
        }
    }

    /// A clock resumed at `tick`, for restoring a saved session.
    pub const fn from_parts(tick: u64, snapshot_interval: NonZeroU64) -> Self {
        Self {
            tick,
            snapshot_interval,
        }
    }

    /// The tick number the next [`advance`](Self::advance) will produce.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the counter is exhausted.
    pub const fn next_tick(&self) -> Result<u64, ClockError> {
        match self.tick.checked_add(1) {
            Some(next) => Ok(next),
            None => Err(ClockError::TickOverflow),
        }
    }

    /// Advance the clock by one tick. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the tick counter would exceed
    /// `u64::MAX`.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.tick = self.next_tick()?;
        Ok(self.tick)
    }

    /// Return the current tick number.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Ticks between snapshots.
    pub const fn snapshot_interval(&self) -> NonZeroU64 {
        self.snapshot_interval
    }

    /// Whether the current tick is due for a snapshot. Tick 0 (the
    /// initial state) always is.
    pub const fn is_snapshot_tick(&self) -> bool {
        matches!(self.tick.checked_rem(self.snapshot_interval.get()), Some(0))
    }

    /// Ticks remaining until the next snapshot tick.
    pub const fn ticks_until_snapshot(&self) -> u64 {
        let interval = self.snapshot_interval.get();
        match self.tick.checked_rem(interval) {
            Some(0) | None => 0,
            Some(into) => interval.saturating_sub(into),
        }
    }
}

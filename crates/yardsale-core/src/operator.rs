//! Operator control state for a running simulation.
//!
//! The original dashboards drove the simulation with Step, Play, and Group
//! buttons. Here those controls are shared state between the run loop and
//! whatever feeds operator input (the engine reads stdin and Ctrl-C).
//!
//! # Architecture
//!
//! Flags that the loop polls every tick are atomics behind an [`Arc`], so
//! reading them never takes a lock. Commands that change the session
//! (selecting or clearing a group) go through a queue the loop drains
//! between ticks, so the session itself is only ever touched by the loop.
//! Every control that changes what the loop should do also fires a
//! [`Notify`] so a paused or sleeping loop reacts at once.
//!
//! [`Arc`]: std::sync::Arc

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};
use yardsale_types::Cutoff;

use crate::config::SimulationBoundsConfig;

/// Smallest accepted tick interval.
pub const MIN_TICK_INTERVAL_MS: u64 = 1;

/// Reason why the simulation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationEndReason {
    /// Reached the configured `max_ticks` limit.
    MaxTicksReached,
    /// Reached the configured `max_real_time_seconds` limit.
    MaxRealTimeReached,
    /// An operator issued a stop command.
    OperatorStop,
}

/// A command that changes the session and is applied between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorCommand {
    /// Highlight the agents in a wealth band, ranked at the time the
    /// command is applied.
    SelectGroup(Cutoff),
    /// Remove the highlight.
    ClearGroup,
}

/// Shared operator control state.
///
/// Wrapped in an `Arc` and shared between the run loop and the input
/// tasks.
#[derive(Debug)]
pub struct OperatorState {
    /// Whether auto-play is off.
    paused: AtomicBool,

    /// Whether a single tick was requested while paused.
    step_requested: AtomicBool,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Wakes the run loop when any control changes.
    signal: Notify,

    /// Current tick interval in milliseconds (runtime-adjustable).
    tick_interval_ms: AtomicU64,

    /// Wall-clock time when the simulation started.
    started_at: DateTime<Utc>,

    /// Maximum number of ticks (0 = unlimited).
    max_ticks: u64,

    /// Maximum wall-clock seconds (0 = unlimited).
    max_real_time_seconds: u64,

    /// Commands awaiting the next gap between ticks.
    commands: Mutex<Vec<OperatorCommand>>,

    /// Reason the simulation ended, if it has.
    end_reason: Mutex<Option<SimulationEndReason>>,
}

impl OperatorState {
    /// Create a new operator state from configuration.
    pub fn new(tick_interval_ms: u64, start_paused: bool, bounds: &SimulationBoundsConfig) -> Self {
        Self {
            paused: AtomicBool::new(start_paused),
            step_requested: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            signal: Notify::new(),
            tick_interval_ms: AtomicU64::new(tick_interval_ms.max(MIN_TICK_INTERVAL_MS)),
            started_at: Utc::now(),
            max_ticks: bounds.max_ticks,
            max_real_time_seconds: bounds.max_real_time_seconds,
            commands: Mutex::new(Vec::new()),
            end_reason: Mutex::new(None),
        }
    }

    /// Wake the run loop.
    fn wake(&self) {
        self.signal.notify_one();
    }

    /// Wait until any control changes.
    ///
    /// A change made while nobody was waiting is remembered, so the next
    /// wait returns immediately. Callers re-check state after waking.
    pub async fn wait_for_signal(&self) {
        self.signal.notified().await;
    }

    /// Like [`wait_for_signal`](Self::wait_for_signal) but gives up after
    /// `timeout`. Returns `true` if a signal arrived.
    pub async fn wait_for_signal_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.signal.notified())
            .await
            .is_ok()
    }

    // -----------------------------------------------------------------------
    // Play / Pause / Step
    // -----------------------------------------------------------------------

    /// Check whether auto-play is off.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Turn auto-play off. The loop finishes the current tick, then waits.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
        self.wake();
    }

    /// Turn auto-play on and wake the loop.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.wake();
    }

    /// Flip auto-play. Returns `true` if the simulation is now playing.
    pub fn toggle_play(&self) -> bool {
        let was_paused = self.paused.fetch_xor(true, Ordering::AcqRel);
        self.wake();
        was_paused
    }

    /// Ask for exactly one tick. Only meaningful while paused; a playing
    /// loop discards the request.
    pub fn request_step(&self) {
        self.step_requested.store(true, Ordering::Release);
        self.wake();
    }

    /// Consume a pending step request.
    pub fn take_step_request(&self) -> bool {
        self.step_requested.swap(false, Ordering::AcqRel)
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean simulation stop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.wake();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Record the reason the simulation ended.
    pub async fn set_end_reason(&self, reason: SimulationEndReason) {
        let mut guard = self.end_reason.lock().await;
        *guard = Some(reason);
    }

    /// Get the reason the simulation ended, if it has.
    pub async fn end_reason(&self) -> Option<SimulationEndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Tick Speed
    // -----------------------------------------------------------------------

    /// Get the current tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Get the current tick interval.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms())
    }

    /// Set the tick interval in milliseconds.
    ///
    /// Returns the previous interval on success, or `None` if the value was
    /// rejected (below [`MIN_TICK_INTERVAL_MS`]).
    pub fn set_tick_interval_ms(&self, ms: u64) -> Option<u64> {
        if ms < MIN_TICK_INTERVAL_MS {
            return None;
        }
        let prev = self.tick_interval_ms.swap(ms, Ordering::AcqRel);
        self.wake();
        Some(prev)
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// Check whether the tick limit has been reached.
    ///
    /// Returns `true` if `max_ticks > 0` and `current_tick >= max_ticks`.
    pub const fn tick_limit_reached(&self, current_tick: u64) -> bool {
        self.max_ticks > 0 && current_tick >= self.max_ticks
    }

    /// Check whether the wall-clock time limit has been reached.
    pub fn time_limit_reached(&self) -> bool {
        self.max_real_time_seconds > 0 && self.elapsed_seconds() >= self.max_real_time_seconds
    }

    /// Return the wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Return elapsed seconds since simulation start.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        // Negative if the wall clock stepped backwards; treat as 0.
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    /// Get the configured max ticks.
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Get the configured max real-time seconds.
    pub const fn max_real_time_seconds(&self) -> u64 {
        self.max_real_time_seconds
    }

    // -----------------------------------------------------------------------
    // Session Commands
    // -----------------------------------------------------------------------

    /// Queue a command for the next gap between ticks.
    pub async fn queue_command(&self, command: OperatorCommand) {
        self.commands.lock().await.push(command);
        self.wake();
    }

    /// Drain all queued commands, oldest first.
    pub async fn drain_commands(&self) -> Vec<OperatorCommand> {
        let mut queue = self.commands.lock().await;
        std::mem::take(&mut *queue)
    }
}

//! Simulation loop runner with operator controls.
//!
//! [`run_simulation`] drives the tick loop with support for:
//!
//! - **Bounded simulation**: stop after `max_ticks` or `max_real_time_seconds`
//! - **Play/pause**: auto-play can be switched off and on
//! - **Single step**: run exactly one tick while paused
//! - **Variable tick speed**: tick interval adjustable at runtime
//! - **Session commands**: group selection applied between ticks
//! - **Operator stop**: clean stop at the next gap between ticks
//!
//! The runner wraps the single-tick [`run_tick`] function and adds the
//! control plane around it.
//!
//! [`run_tick`]: crate::tick::run_tick

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use crate::operator::{OperatorCommand, OperatorState, SimulationEndReason};
use crate::tick::{self, SimulationState, TickError, TickSummary};

/// Longest a paused loop sleeps before re-checking the time limit.
const PAUSED_POLL: Duration = Duration::from_secs(1);

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },
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
/// The engine uses this to stream snapshots. The callback receives the
/// tick summary and the current simulation state.
pub trait TickCallback: Send {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState);
}

/// A no-op tick callback for testing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _state: &SimulationState) {}
}

/// Run the simulation loop until a termination condition is met.
///
/// Each iteration drains queued operator commands, honors a stop request
/// and the time limit, waits while paused unless a single step was
/// requested, runs one tick, notifies `callback`, and honors the tick
/// limit. While playing it then waits the tick interval, waking early if
/// an operator control changes.
///
/// # Errors
///
/// Returns [`RunnerError`] if a tick execution fails unrecoverably.
pub async fn run_simulation(
    state: &mut SimulationState,
    operator: &Arc<OperatorState>,
    callback: &mut dyn TickCallback,
    rng: &mut impl Rng,
) -> Result<SimulationResult, RunnerError> {
    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;
    let mut reported_pause = false;

    info!(
        run_id = %state.run_id,
        max_ticks = operator.max_ticks(),
        max_real_time_seconds = operator.max_real_time_seconds(),
        tick_interval_ms = operator.tick_interval_ms(),
        paused = operator.is_paused(),
        "Simulation starting"
    );

    loop {
        // --- Apply queued session commands ---
        for command in operator.drain_commands().await {
            apply_command(state, command);
        }

        // --- Check stop request (before tick) ---
        if operator.is_stop_requested() {
            info!("Operator stop requested");
            return Ok(finish(
                operator,
                SimulationEndReason::OperatorStop,
                last_summary,
                total_ticks,
            )
            .await);
        }

        // --- Check time limit (before tick) ---
        if operator.time_limit_reached() {
            info!(
                max_seconds = operator.max_real_time_seconds(),
                elapsed = operator.elapsed_seconds(),
                "Real-time limit reached"
            );
            return Ok(finish(
                operator,
                SimulationEndReason::MaxRealTimeReached,
                last_summary,
                total_ticks,
            )
            .await);
        }

        // --- Check pause ---
        let stepping = operator.take_step_request();
        if operator.is_paused() && !stepping {
            if !reported_pause {
                info!(tick = state.clock.tick(), "Simulation paused");
                reported_pause = true;
            }
            operator.wait_for_signal_timeout(PAUSED_POLL).await;
            continue;
        }
        if reported_pause && !operator.is_paused() {
            info!(tick = state.clock.tick(), "Simulation resumed");
            reported_pause = false;
        }

        // --- Execute tick ---
        let summary = tick::run_tick(state, rng)?;
        total_ticks = total_ticks.saturating_add(1);

        // --- Notify callback ---
        callback.on_tick(&summary, state);

        // --- Check tick limit (after tick) ---
        // summary.tick is the tick that just ran; with max_ticks = 5 the run
        // stops once tick 5 has completed.
        if operator.tick_limit_reached(summary.tick) {
            info!(
                tick = summary.tick,
                max_ticks = operator.max_ticks(),
                "Tick limit reached"
            );
            return Ok(finish(
                operator,
                SimulationEndReason::MaxTicksReached,
                Some(summary),
                total_ticks,
            )
            .await);
        }

        last_summary = Some(summary);

        // --- Wait for tick interval ---
        if !operator.is_paused() {
            operator
                .wait_for_signal_timeout(operator.tick_interval())
                .await;
        }
    }
}

/// Apply one queued command to the session.
fn apply_command(state: &mut SimulationState, command: OperatorCommand) {
    match command {
        OperatorCommand::SelectGroup(cutoff) => {
            state.select_group(cutoff);
        }
        OperatorCommand::ClearGroup => {
            if state.clear_group().is_none() {
                warn!("Clear requested but no group is selected");
            }
        }
    }
}

/// Record the end reason and build the result.
async fn finish(
    operator: &OperatorState,
    end_reason: SimulationEndReason,
    final_summary: Option<TickSummary>,
    total_ticks: u64,
) -> SimulationResult {
    operator.set_end_reason(end_reason).await;
    SimulationResult {
        end_reason,
        final_summary,
        total_ticks,
    }
}

/// Log the simulation end sequence.
///
/// Called after [`run_simulation`] returns.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            bottom_half = summary.summary.bottom_half,
            top_tenth = summary.summary.top_tenth,
            bottom_share = %summary.summary.bottom_share(),
            top_share = %summary.summary.top_share(),
            "Final tick summary"
        );
    } else {
        warn!("Simulation ended with no ticks executed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use yardsale_types::Cutoff;

    use super::*;
    use crate::config::{SimulationBoundsConfig, SimulationConfig};

    fn make_simulation_state() -> SimulationState {
        let mut config = SimulationConfig::default();
        config.population.agent_count = 10;
        config.population.initial_wealth = 10;
        SimulationState::new(&config).unwrap()
    }

    fn bounds(max_ticks: u64) -> SimulationBoundsConfig {
        SimulationBoundsConfig {
            max_ticks,
            max_real_time_seconds: 0,
        }
    }

    struct CountCallback {
        count: u64,
    }

    impl TickCallback for CountCallback {
        fn on_tick(&mut self, _summary: &TickSummary, _state: &SimulationState) {
            self.count = self.count.saturating_add(1);
        }
    }

    #[tokio::test]
    async fn bounded_by_max_ticks() {
        let mut state = make_simulation_state();
        let operator = Arc::new(OperatorState::new(1, false, &bounds(5)));
        let mut rng = SmallRng::seed_from_u64(42);

        let result = run_simulation(&mut state, &operator, &mut NoOpCallback, &mut rng)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::MaxTicksReached);
        assert_eq!(result.total_ticks, 5);
        assert_eq!(result.final_summary.map(|s| s.tick), Some(5));
        assert_eq!(state.history.len(), 5);
        assert_eq!(
            operator.end_reason().await,
            Some(SimulationEndReason::MaxTicksReached)
        );
    }

    #[tokio::test]
    async fn operator_stop() {
        let mut state = make_simulation_state();
        let operator = Arc::new(OperatorState::new(1, false, &bounds(0)));
        operator.request_stop();
        let mut rng = SmallRng::seed_from_u64(42);

        let result = run_simulation(&mut state, &operator, &mut NoOpCallback, &mut rng)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::OperatorStop);
        assert_eq!(result.total_ticks, 0);
        assert!(result.final_summary.is_none());
    }

    #[tokio::test]
    async fn tick_callback_is_called() {
        let mut state = make_simulation_state();
        let operator = Arc::new(OperatorState::new(1, false, &bounds(3)));
        let mut cb = CountCallback { count: 0 };
        let mut rng = SmallRng::seed_from_u64(42);

        run_simulation(&mut state, &operator, &mut cb, &mut rng)
            .await
            .unwrap();

        assert_eq!(cb.count, 3);
    }

    #[tokio::test]
    async fn step_while_paused_runs_one_tick() {
        let mut state = make_simulation_state();
        let operator = Arc::new(OperatorState::new(1, true, &bounds(0)));
        operator.request_step();
        let mut cb = CountCallback { count: 0 };
        let mut rng = SmallRng::seed_from_u64(42);

        let stopper = Arc::clone(&operator);
        let stop_later = async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            stopper.request_stop();
        };
        let (result, ()) = tokio::join!(
            run_simulation(&mut state, &operator, &mut cb, &mut rng),
            stop_later
        );
        let result = result.unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::OperatorStop);
        assert_eq!(result.total_ticks, 1);
        assert_eq!(cb.count, 1);
        assert_eq!(state.clock.tick(), 1);
    }

    #[tokio::test]
    async fn queued_group_applies_before_next_tick() {
        let mut state = make_simulation_state();
        let operator = Arc::new(OperatorState::new(1, false, &bounds(1)));
        operator
            .queue_command(OperatorCommand::SelectGroup(Cutoff::Top10))
            .await;
        let mut rng = SmallRng::seed_from_u64(42);

        run_simulation(&mut state, &operator, &mut NoOpCallback, &mut rng)
            .await
            .unwrap();

        // Ranked on the uniform start: ties go to the highest index.
        let highlight = state.highlight().unwrap();
        assert_eq!(highlight.cutoff, Cutoff::Top10);
        assert_eq!(crate::grouping::members(&highlight.mask), vec![9]);
    }

    #[tokio::test]
    async fn clear_group_command_removes_highlight() {
        let mut state = make_simulation_state();
        state.select_group(Cutoff::Bottom25);
        let operator = Arc::new(OperatorState::new(1, false, &bounds(1)));
        operator.queue_command(OperatorCommand::ClearGroup).await;
        let mut rng = SmallRng::seed_from_u64(42);

        run_simulation(&mut state, &operator, &mut NoOpCallback, &mut rng)
            .await
            .unwrap();

        assert!(state.highlight().is_none());
    }

    #[tokio::test]
    async fn variable_speed_changes_interval() {
        let operator = Arc::new(OperatorState::new(1000, false, &bounds(0)));

        assert_eq!(operator.tick_interval_ms(), 1000);
        let _ = operator.set_tick_interval_ms(500);
        assert_eq!(operator.tick_interval_ms(), 500);
    }
}

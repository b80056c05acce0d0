//! Tick cycle: one application of the yard-sale step plus its bookkeeping.
//!
//! Each tick runs through three phases:
//!
//! 1. **Redistribute** -- every solvent agent gives one unit to a random
//!    recipient (see [`redistribution`](crate::redistribution)).
//!
//! 2. **Reconcile** -- the tick's transfers are recorded in the
//!    [`Ledger`] and, when enabled, checked against the change in the
//!    wealth vector. A mismatch is logged, never fatal.
//!
//! 3. **Record** -- the new quantile summary is appended to the history.
//!
//! The cycle is deterministic given the same initial state and random
//! source. A tick either completes or leaves the state untouched.

use rand::Rng;
use tracing::{debug, error, info};
use yardsale_ledger::{ConservationResult, Ledger, LedgerError};
use yardsale_types::{Cutoff, QuantileSummary, RunId, TickSnapshot};

use crate::clock::{ClockError, SimulationClock};
use crate::config::{ConfigError, SimulationConfig};
use crate::grouping;
use crate::histogram::{self, HistogramSpec};
use crate::history::History;
use crate::quantile;
use crate::redistribution;
use crate::wealth::{WealthError, WealthVector};

/// Errors that can occur during tick execution or session setup.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A clock operation failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// The wealth vector rejected an operation.
    #[error("wealth error: {source}")]
    Wealth {
        /// The underlying wealth error.
        #[from]
        source: WealthError,
    },

    /// A transfer could not be recorded.
    #[error("ledger error: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: LedgerError,
    },

    /// The configuration could not be turned into a session.
    #[error("config error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },
}

/// How much conservation checking each tick does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// Record transfers but do not reconcile them.
    Off,
    /// Reconcile per-agent balances and the total.
    Standard,
    /// Also flag agents that gave more than they held.
    Strict,
}

impl Verification {
    /// Pick the level from the ledger section of the configuration.
    pub const fn from_config(config: &SimulationConfig) -> Self {
        match (config.ledger.verify_conservation, config.ledger.strict) {
            (false, _) => Self::Off,
            (true, false) => Self::Standard,
            (true, true) => Self::Strict,
        }
    }
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Agents that gave a unit this tick.
    pub benefactors: usize,
    /// Quantile summary after the tick.
    pub summary: QuantileSummary,
    /// Whether the ledger reconciled. Always `true` when verification is
    /// off.
    pub balanced: bool,
}

/// A highlighted group: the band it was selected from and the agents it
/// flagged at selection time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    /// The selected band.
    pub cutoff: Cutoff,
    /// Per-agent flags, frozen when the group was selected.
    pub mask: Vec<bool>,
}

/// The mutable simulation state passed through the tick cycle.
///
/// Owned by the caller. Nothing here is global, so several sessions can
/// run side by side.
#[derive(Debug)]
pub struct SimulationState {
    /// Identifies this run in snapshots and logs.
    pub run_id: RunId,
    /// The tick counter.
    pub clock: SimulationClock,
    /// Per-tick quantile summaries.
    pub history: History,
    /// Current per-agent wealth.
    wealth: WealthVector,
    /// Transfers of the most recent tick.
    ledger: Ledger,
    /// The selected group, if any.
    highlight: Option<Highlight>,
    /// Histogram layout for snapshots.
    histogram: HistogramSpec,
    /// Conservation checking level.
    verification: Verification,
    /// Whether snapshots carry the per-agent wealth.
    include_wealth: bool,
}

impl SimulationState {
    /// A fresh session: every agent holds the configured initial wealth.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::Config`] for an invalid configuration.
    pub fn new(config: &SimulationConfig) -> Result<Self, TickError> {
        config.validate()?;
        let wealth = WealthVector::uniform(
            config.population.agent_count,
            config.population.initial_wealth,
        )?;
        Self::from_parts(config, wealth, History::new(), 0)
    }

    /// Resume a session from a saved wealth vector, history, and tick.
    ///
    /// # Errors
    ///
    /// Returns [`WealthError::LengthMismatch`] (as [`TickError::Wealth`])
    /// when the vector does not match the configured population, or
    /// [`TickError::Config`] for an invalid configuration. The configuration
    /// is validated here as well as in [`new`](Self::new), so a resumed
    /// session gets the same limits as a fresh one.
    pub fn from_parts(
        config: &SimulationConfig,
        wealth: WealthVector,
        history: History,
        tick: u64,
    ) -> Result<Self, TickError> {
        config.validate()?;
        let expected = config.population.agent_count;
        if wealth.len() != expected {
            return Err(WealthError::LengthMismatch {
                expected,
                actual: wealth.len(),
            }
            .into());
        }
        let snapshot_interval = std::num::NonZeroU64::new(config.output.snapshot_interval_ticks)
            .ok_or_else(|| ConfigError::Invalid {
                reason: "output.snapshot_interval_ticks must be at least 1".to_owned(),
            })?;

        let state = Self {
            run_id: RunId::new(),
            clock: SimulationClock::from_parts(tick, snapshot_interval),
            history,
            ledger: Ledger::new(tick, wealth.len()),
            wealth,
            highlight: None,
            histogram: config.histogram_spec()?,
            verification: Verification::from_config(config),
            include_wealth: config.output.include_wealth,
        };
        info!(
            run_id = %state.run_id,
            agents = state.wealth.len(),
            total_wealth = state.wealth.total(),
            tick,
            "Simulation state initialized"
        );
        Ok(state)
    }

    /// Current per-agent wealth.
    pub const fn wealth(&self) -> &WealthVector {
        &self.wealth
    }

    /// Transfers recorded during the most recent tick.
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The selected group, if any.
    pub const fn highlight(&self) -> Option<&Highlight> {
        self.highlight.as_ref()
    }

    /// Quantile summary of the current wealth.
    pub fn summary(&self) -> QuantileSummary {
        quantile::summarize(&self.wealth)
    }

    /// Highlight the agents currently in `cutoff`'s band. The selection
    /// does not follow them as their wealth changes.
    pub fn select_group(&mut self, cutoff: Cutoff) -> &Highlight {
        let mask = grouping::rank_mask(&self.wealth, cutoff);
        info!(
            tick = self.clock.tick(),
            group = %cutoff,
            members = mask.iter().filter(|&&flag| flag).count(),
            "Group selected"
        );
        self.highlight.insert(Highlight { cutoff, mask })
    }

    /// Remove the highlight. Returns the group that was selected, if any.
    pub fn clear_group(&mut self) -> Option<Cutoff> {
        let cleared = self.highlight.take().map(|h| h.cutoff);
        if let Some(cutoff) = cleared {
            info!(tick = self.clock.tick(), group = %cutoff, "Group cleared");
        }
        cleared
    }

    /// Serializable picture of the current state, with an empty series.
    pub fn snapshot(&self) -> TickSnapshot {
        self.snapshot_since(Some(self.clock.tick()))
    }

    /// Serializable picture of the current state whose series holds the
    /// summaries of every tick after `previous`. `None` takes the whole
    /// history.
    pub fn snapshot_since(&self, previous: Option<u64>) -> TickSnapshot {
        let series = previous
            .map_or_else(
                || self.history.entries(),
                |previous| {
                    let count = self.clock.tick().saturating_sub(previous);
                    self.history
                        .tail(usize::try_from(count).unwrap_or(usize::MAX))
                },
            )
            .to_vec();
        TickSnapshot {
            run_id: self.run_id,
            tick: self.clock.tick(),
            summary: self.summary(),
            histogram: histogram::histogram(&self.wealth, self.histogram),
            wealth: self
                .include_wealth
                .then(|| self.wealth.as_slice().to_vec()),
            highlight: self.highlight.as_ref().map(|h| h.cutoff),
            highlight_mask: self.highlight.as_ref().map(|h| h.mask.clone()),
            series,
            created_at: chrono::Utc::now(),
        }
    }
}

/// Execute a single tick.
///
/// # Errors
///
/// Returns [`TickError`] if the clock is exhausted, the step overflows a
/// balance, or a transfer cannot be recorded. The state is unchanged when
/// the clock or step fails.
pub fn run_tick(
    state: &mut SimulationState,
    rng: &mut impl Rng,
) -> Result<TickSummary, TickError> {
    let tick = state.clock.next_tick()?;

    // Phase 1: Redistribute
    let before = match state.verification {
        Verification::Off => None,
        Verification::Standard | Verification::Strict => Some(state.wealth.as_slice().to_vec()),
    };
    let outcome = redistribution::step_in_place(&mut state.wealth, rng)?;
    state.clock.advance()?;

    // Phase 2: Reconcile
    state.ledger.reset(tick, state.wealth.len());
    for transfer in outcome.transfers {
        state.ledger.record_transfer(transfer)?;
    }
    let balanced = reconcile(state, before.as_deref());

    // Phase 3: Record
    let summary = quantile::summarize(&state.wealth);
    state.history.push(summary);

    debug!(
        tick,
        benefactors = outcome.benefactors,
        bottom_half = summary.bottom_half,
        top_tenth = summary.top_tenth,
        "Tick complete"
    );

    Ok(TickSummary {
        tick,
        benefactors: outcome.benefactors,
        summary,
        balanced,
    })
}

/// Check the ledger against the wealth change. Returns whether it
/// balanced; anomalies are logged.
fn reconcile(state: &SimulationState, before: Option<&[u64]>) -> bool {
    let Some(before) = before else {
        return true;
    };
    let after = state.wealth.as_slice();
    let result = match state.verification {
        Verification::Strict => state.ledger.verify_conservation_strict(before, after),
        Verification::Standard | Verification::Off => {
            state.ledger.verify_conservation(before, after)
        }
    };
    match result {
        ConservationResult::Balanced => true,
        ConservationResult::Anomaly(anomaly) => {
            error!(
                tick = anomaly.tick,
                total_before = %anomaly.total_before,
                total_after = %anomaly.total_after,
                imbalances = ?anomaly.imbalances,
                "Conservation anomaly: {}",
                anomaly.message
            );
            false
        }
    }
}

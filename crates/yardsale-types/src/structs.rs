//! Core data structs shared between the simulation and its consumers.
//!
//! Everything here is plain data: the simulation core computes these
//! values, the engine serializes them, and a dashboard renders them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::Cutoff;
use crate::ids::RunId;

// ---------------------------------------------------------------------------
// Quantile summary
// ---------------------------------------------------------------------------

/// Aggregate wealth held by the poorest half and the richest tenth.
///
/// Derived from a wealth vector by sorting ascending, summing the first
/// `n / 2` values for the bottom figure and the last `n - 9n / 10` values
/// for the top figure. The total is carried alongside so shares can be
/// computed without the vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct QuantileSummary {
    /// Wealth held by the poorest 50% of agents.
    #[serde(rename = "bottom_50_pct")]
    pub bottom_half: u64,
    /// Wealth held by the richest 10% of agents.
    #[serde(rename = "top_10_pct")]
    pub top_tenth: u64,
    /// Total wealth across all agents.
    pub total: u64,
}

impl QuantileSummary {
    /// Fraction of total wealth held by the bottom half.
    ///
    /// Returns zero when the economy holds no wealth at all.
    pub fn bottom_share(&self) -> Decimal {
        share(self.bottom_half, self.total)
    }

    /// Fraction of total wealth held by the top tenth.
    ///
    /// Returns zero when the economy holds no wealth at all.
    pub fn top_share(&self) -> Decimal {
        share(self.top_tenth, self.total)
    }
}

/// `part / whole` as a [`Decimal`], or zero for an empty whole.
fn share(part: u64, whole: u64) -> Decimal {
    Decimal::from(part)
        .checked_div(Decimal::from(whole))
        .unwrap_or(Decimal::ZERO)
}

// ---------------------------------------------------------------------------
// Transfers
// ---------------------------------------------------------------------------

/// Wealth moved from one agent to another during a tick.
///
/// Agents are identified by their index in the wealth vector. A transfer
/// may name the same agent on both sides: a benefactor can draw itself as
/// the recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Transfer {
    /// Index of the giving agent.
    pub from: usize,
    /// Index of the receiving agent.
    pub to: usize,
    /// Units moved (always 1 for a yard-sale gift).
    pub amount: u64,
}

impl Transfer {
    /// A single-unit gift from `from` to `to`.
    pub const fn gift(from: usize, to: usize) -> Self {
        Self { from, to, amount: 1 }
    }
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

/// One fixed-width bin of a wealth histogram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HistogramBin {
    /// Inclusive lower edge of the bin.
    pub lower: u64,
    /// Exclusive upper edge of the bin.
    pub upper: u64,
    /// Number of agents whose wealth falls in `[lower, upper)`.
    pub count: u64,
    /// `count` divided by the population size.
    #[ts(as = "String")]
    pub probability: Decimal,
}

/// Wealth distribution bucketed into fixed-width bins.
///
/// Bins cover `[0, upper_bound)`. Agents at or above the upper bound are
/// counted in `overflow` rather than silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WealthHistogram {
    /// Width of every bin.
    pub bin_width: u64,
    /// The bins in ascending order.
    pub bins: Vec<HistogramBin>,
    /// Agents whose wealth is at or above the last bin's upper edge.
    pub overflow: u64,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Everything a dashboard needs to draw one frame of the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TickSnapshot {
    /// The run this snapshot belongs to.
    pub run_id: RunId,
    /// Number of ticks completed.
    pub tick: u64,
    /// Quantile summary after the tick.
    pub summary: QuantileSummary,
    /// Distribution of wealth after the tick.
    pub histogram: WealthHistogram,
    /// Per-agent wealth, omitted when the run is configured to skip it.
    pub wealth: Option<Vec<u64>>,
    /// The highlighted group, if one is selected.
    pub highlight: Option<Cutoff>,
    /// Per-agent highlight flags, present whenever `highlight` is.
    pub highlight_mask: Option<Vec<bool>>,
    /// Summaries of the ticks completed since the previous snapshot, oldest
    /// first. Concatenated across a stream of snapshots this is the full
    /// per-tick series.
    pub series: Vec<QuantileSummary>,
    /// Wall-clock time the snapshot was taken.
    pub created_at: DateTime<Utc>,
}

//! Per-tick transfer ledger and wealth conservation checks for the Yard
//! Sale simulation.
//!
//! Every unit of wealth that moves during a tick is recorded as a
//! [`Transfer`] in the tick's [`Ledger`]. Wealth is never created or
//! destroyed: the only flows are agent-to-agent gifts. The conservation
//! law is verified at the end of every tick against the balances before
//! and after the tick.
//!
//! # Architecture
//!
//! - [`ledger`] -- The [`Ledger`] struct: the transfers of a single tick.
//! - [`conservation`] -- Conservation law verification and anomaly
//!   detection.
//!
//! # Conservation Law
//!
//! For every tick T and every agent i:
//!
//! ```text
//! after[i] == before[i] - sum(debits of i in T) + sum(credits of i in T)
//! ```
//!
//! and therefore `sum(after) == sum(before)`. A violation produces a
//! [`LedgerAnomaly`]. The ledger never panics; it returns errors.
//!
//! # Usage
//!
//! ```
//! use yardsale_ledger::{ConservationResult, Ledger};
//!
//! let before: Vec<u64> = vec![1, 0, 2];
//! let mut ledger = Ledger::new(1, before.len());
//! ledger.record_gift(0, 1).ok();
//! ledger.record_gift(2, 2).ok();
//!
//! let after: Vec<u64> = vec![0, 1, 2];
//! assert_eq!(ledger.verify_conservation(&before, &after), ConservationResult::Balanced);
//! ```
//!
//! [`Transfer`]: yardsale_types::Transfer

pub mod conservation;
pub mod ledger;

// Re-export primary types at crate root.
pub use conservation::ConservationResult;
pub use ledger::Ledger;

use std::collections::BTreeMap;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when recording ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Transfer amount must be strictly positive.
    #[error("ledger transfer amount must be non-zero")]
    ZeroAmount,

    /// A transfer named an agent outside the population.
    #[error("agent {agent} is outside the population of {population}")]
    AgentOutOfRange {
        /// The offending agent index.
        agent: usize,
        /// Number of agents in the population.
        population: usize,
    },

    /// An internal error that should not occur in normal operation.
    #[error("internal ledger error: {0}")]
    InternalError(&'static str),
}

// ---------------------------------------------------------------------------
// Anomaly type
// ---------------------------------------------------------------------------

/// The balance an agent should have ended the tick with, and the balance
/// it actually has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgentImbalance {
    /// `before - debits + credits`, as recorded by the ledger.
    pub expected: i128,
    /// The balance observed after the tick.
    pub actual: u64,
}

/// A conservation law violation detected during tick verification.
///
/// When the conservation check finds that the recorded transfers do not
/// reconcile the balances before the tick with the balances after it, this
/// struct captures the details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerAnomaly {
    /// The tick where the anomaly was detected.
    pub tick: u64,
    /// Total wealth before the tick.
    pub total_before: u128,
    /// Total wealth after the tick.
    pub total_after: u128,
    /// Per-agent imbalance for each agent that did not reconcile.
    pub imbalances: BTreeMap<usize, AgentImbalance>,
    /// Human-readable description of the anomaly.
    pub message: String,
}

impl core::fmt::Display for LedgerAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}

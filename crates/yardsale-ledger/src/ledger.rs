//! The tick ledger: an append-only log of the transfers made in one tick.
//!
//! The [`Ledger`] struct holds every [`Transfer`] recorded while a tick is
//! applied and verifies the conservation law once the tick completes.
//!
//! # Design
//!
//! - **Append-only**: transfers are never modified or deleted within a tick.
//! - **Double-entry**: every transfer has a debit (from) and credit (to).
//! - **Per tick**: the ledger is reset for the next tick with [`Ledger::reset`],
//!   which keeps the allocation. Totals are conserved forever, so there is
//!   nothing to carry across ticks.

use tracing::warn;
use yardsale_types::Transfer;

use crate::LedgerError;
use crate::conservation::{ConservationResult, verify_conservation, verify_conservation_strict};

/// The transfers recorded during one tick of the simulation.
///
/// The ledger enforces two invariants at recording time:
/// 1. All amounts are positive.
/// 2. Both sides of every transfer are agents in the population.
///
/// The third invariant, conservation, is checked after the tick with
/// [`verify_conservation`](Ledger::verify_conservation).
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    /// The tick these transfers belong to.
    tick: u64,
    /// Number of agents transfers may reference.
    population: usize,
    /// All transfers, in recording order.
    transfers: Vec<Transfer>,
}

impl Ledger {
    /// Create an empty ledger for `tick` over `population` agents.
    pub const fn new(tick: u64, population: usize) -> Self {
        Self {
            tick,
            population,
            transfers: Vec::new(),
        }
    }

    /// The tick this ledger records.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// The number of agents transfers may reference.
    pub const fn population(&self) -> usize {
        self.population
    }

    /// Return the number of transfers recorded.
    pub const fn len(&self) -> usize {
        self.transfers.len()
    }

    /// Return whether no transfers have been recorded.
    pub const fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    /// All transfers, in recording order.
    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    /// Total units moved this tick.
    pub fn total_moved(&self) -> u128 {
        self.transfers
            .iter()
            .fold(0_u128, |acc, t| acc.saturating_add(u128::from(t.amount)))
    }

    /// Clear the ledger and point it at a new tick.
    pub fn reset(&mut self, tick: u64, population: usize) {
        self.tick = tick;
        self.population = population;
        self.transfers.clear();
    }

    /// Record a transfer between two agents.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ZeroAmount`] for an empty transfer, or
    /// [`LedgerError::AgentOutOfRange`] if either side is not an agent in
    /// the population.
    pub fn record_transfer(&mut self, transfer: Transfer) -> Result<&Transfer, LedgerError> {
        if transfer.amount == 0 {
            warn!(
                tick = self.tick,
                from = transfer.from,
                to = transfer.to,
                "Empty transfer rejected"
            );
            return Err(LedgerError::ZeroAmount);
        }
        for agent in [transfer.from, transfer.to] {
            if agent >= self.population {
                warn!(
                    tick = self.tick,
                    agent,
                    population = self.population,
                    "Transfer names unknown agent"
                );
                return Err(LedgerError::AgentOutOfRange {
                    agent,
                    population: self.population,
                });
            }
        }

        self.transfers.push(transfer);
        // Return a reference to the transfer we just pushed.
        self.transfers.last().ok_or(LedgerError::InternalError(
            "failed to retrieve transfer after append",
        ))
    }

    /// Record a single-unit gift from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AgentOutOfRange`] if either side is not an
    /// agent in the population.
    pub fn record_gift(&mut self, from: usize, to: usize) -> Result<&Transfer, LedgerError> {
        self.record_transfer(Transfer::gift(from, to))
    }

    /// Verify that the recorded transfers explain the change from `before`
    /// to `after`.
    pub fn verify_conservation(&self, before: &[u64], after: &[u64]) -> ConservationResult {
        verify_conservation(self.tick, before, after, &self.transfers)
    }

    /// Verify conservation and that no agent gave more than it started with.
    pub fn verify_conservation_strict(&self, before: &[u64], after: &[u64]) -> ConservationResult {
        verify_conservation_strict(self.tick, before, after, &self.transfers)
    }
}

//! Conservation law verification for the per-tick ledger.
//!
//! The conservation law enforces that wealth only ever moves between
//! agents: every unit debited from a benefactor is credited to a
//! recipient, and the balances after a tick are exactly the balances
//! before it plus each agent's net flow.
//!
//! For each agent i in tick T, the check is:
//!
//! ```text
//! after[i] == before[i] - debits(i, T) + credits(i, T)
//! ```
//!
//! Each recorded transfer adds its amount to one agent's credits and the
//! same amount to another agent's debits, so the per-agent check implies
//! `sum(after) == sum(before)`. Both are checked.
//!
//! A violation produces a [`LedgerAnomaly`] -- the simulation's most
//! critical integrity alert.

use std::collections::BTreeMap;

use yardsale_types::Transfer;

use crate::{AgentImbalance, LedgerAnomaly};

/// The result of a conservation check for a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConservationResult {
    /// The ledger reconciles the balances for this tick.
    Balanced,
    /// One or more agents have balances the ledger cannot explain.
    Anomaly(LedgerAnomaly),
}

impl ConservationResult {
    /// Whether the check passed.
    pub const fn is_balanced(&self) -> bool {
        matches!(self, Self::Balanced)
    }
}

/// Per-agent debit and credit totals accumulated from a tick's transfers.
struct Flows {
    debits: Vec<u128>,
    credits: Vec<u128>,
}

/// Sum the transfers into per-agent flows.
///
/// Returns `None` if a transfer names an agent outside the population.
fn accumulate(population: usize, transfers: &[Transfer]) -> Option<Flows> {
    let mut debits = vec![0_u128; population];
    let mut credits = vec![0_u128; population];

    for transfer in transfers {
        let amount = u128::from(transfer.amount);
        let d = debits.get_mut(transfer.from)?;
        *d = d.saturating_add(amount);
        let c = credits.get_mut(transfer.to)?;
        *c = c.saturating_add(amount);
    }

    Some(Flows { debits, credits })
}

/// Sum a balance slice without overflow.
fn total(balances: &[u64]) -> u128 {
    balances
        .iter()
        .fold(0_u128, |acc, &b| acc.saturating_add(u128::from(b)))
}

/// Convert a `u128` flow to `i128`, saturating at the maximum.
fn signed(value: u128) -> i128 {
    i128::try_from(value).unwrap_or(i128::MAX)
}

/// Verify the conservation law for one tick.
///
/// `before` and `after` are the agents' balances at the start and end of
/// the tick; `transfers` is everything the ledger recorded in between.
/// The population must not change size during a tick.
pub fn verify_conservation(
    tick: u64,
    before: &[u64],
    after: &[u64],
    transfers: &[Transfer],
) -> ConservationResult {
    let total_before = total(before);
    let total_after = total(after);

    if before.len() != after.len() {
        return ConservationResult::Anomaly(LedgerAnomaly {
            tick,
            total_before,
            total_after,
            imbalances: BTreeMap::new(),
            message: format!(
                "LEDGER_ANOMALY at tick {tick}: population changed from {} to {} agents",
                before.len(),
                after.len()
            ),
        });
    }

    let Some(flows) = accumulate(before.len(), transfers) else {
        return ConservationResult::Anomaly(LedgerAnomaly {
            tick,
            total_before,
            total_after,
            imbalances: BTreeMap::new(),
            message: format!(
                "LEDGER_ANOMALY at tick {tick}: transfer references an agent outside the population of {}",
                before.len()
            ),
        });
    };

    let mut imbalances: BTreeMap<usize, AgentImbalance> = BTreeMap::new();

    let rows = before
        .iter()
        .zip(after)
        .zip(flows.debits.iter().zip(&flows.credits))
        .enumerate();
    for (agent, ((&start, &end), (&debit, &credit))) in rows {
        let expected = i128::from(start)
            .saturating_sub(signed(debit))
            .saturating_add(signed(credit));
        if expected != i128::from(end) {
            imbalances.insert(
                agent,
                AgentImbalance {
                    expected,
                    actual: end,
                },
            );
        }
    }

    if imbalances.is_empty() && total_before == total_after {
        ConservationResult::Balanced
    } else {
        let count = imbalances.len();
        ConservationResult::Anomaly(LedgerAnomaly {
            tick,
            total_before,
            total_after,
            imbalances,
            message: format!(
                "LEDGER_ANOMALY at tick {tick}: conservation law violated for {count} agent(s), total {total_before} -> {total_after}",
            ),
        })
    }
}

/// Verify conservation with an additional overdraft check.
///
/// Performs the reconciliation from [`verify_conservation`] and then
/// checks that no agent gave away more than it held when the tick began.
/// Gifts are paid out of starting balances before any credit lands, so an
/// agent with zero wealth must never appear as a benefactor.
pub fn verify_conservation_strict(
    tick: u64,
    before: &[u64],
    after: &[u64],
    transfers: &[Transfer],
) -> ConservationResult {
    let result = verify_conservation(tick, before, after, transfers);
    if let ConservationResult::Anomaly(_) = &result {
        return result;
    }

    let Some(flows) = accumulate(before.len(), transfers) else {
        // verify_conservation already rejected out-of-range transfers.
        return result;
    };

    let mut imbalances: BTreeMap<usize, AgentImbalance> = BTreeMap::new();
    let rows = before.iter().zip(after).zip(&flows.debits).enumerate();
    for (agent, ((&start, &end), &debit)) in rows {
        if debit > u128::from(start) {
            imbalances.insert(
                agent,
                AgentImbalance {
                    expected: i128::from(start).saturating_sub(signed(debit)),
                    actual: end,
                },
            );
        }
    }

    if imbalances.is_empty() {
        ConservationResult::Balanced
    } else {
        let count = imbalances.len();
        ConservationResult::Anomaly(LedgerAnomaly {
            tick,
            total_before: total(before),
            total_after: total(after),
            imbalances,
            message: format!(
                "LEDGER_ANOMALY at tick {tick}: {count} agent(s) gave more than they held",
            ),
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn empty_tick_is_balanced() {
        let balances = [5, 0, 3];
        let result = verify_conservation(1, &balances, &balances, &[]);
        assert_eq!(result, ConservationResult::Balanced);
    }

    #[test]
    fn single_gift_is_balanced() {
        let before = [5, 0];
        let after = [4, 1];
        let result = verify_conservation(1, &before, &after, &[Transfer::gift(0, 1)]);
        assert_eq!(result, ConservationResult::Balanced);
    }

    #[test]
    fn gift_to_self_is_balanced() {
        let balances = [2, 2];
        let result = verify_conservation(1, &balances, &balances, &[Transfer::gift(1, 1)]);
        assert!(result.is_balanced());
    }

    #[test]
    fn unrecorded_change_is_an_anomaly() {
        // Agent 1 gained a unit that no transfer explains.
        let before = [3, 3];
        let after = [3, 4];
        let result = verify_conservation(7, &before, &after, &[]);
        let ConservationResult::Anomaly(anomaly) = result else {
            panic!("expected anomaly");
        };
        assert_eq!(anomaly.tick, 7);
        assert_eq!(anomaly.total_before, 6);
        assert_eq!(anomaly.total_after, 7);
        assert_eq!(
            anomaly.imbalances.get(&1),
            Some(&AgentImbalance {
                expected: 3,
                actual: 4
            })
        );
        assert!(anomaly.message.contains("LEDGER_ANOMALY"));
    }

    #[test]
    fn misattributed_recipient_is_an_anomaly() {
        // Totals match, but the ledger says agent 2 received the unit.
        let before = [1, 0, 0];
        let after = [0, 1, 0];
        let result = verify_conservation(1, &before, &after, &[Transfer::gift(0, 2)]);
        let ConservationResult::Anomaly(anomaly) = result else {
            panic!("expected anomaly");
        };
        assert_eq!(anomaly.total_before, anomaly.total_after);
        assert_eq!(anomaly.imbalances.len(), 2);
        assert!(anomaly.imbalances.contains_key(&1));
        assert!(anomaly.imbalances.contains_key(&2));
    }

    #[test]
    fn population_change_is_an_anomaly() {
        let result = verify_conservation(1, &[1, 1], &[2], &[]);
        let ConservationResult::Anomaly(anomaly) = result else {
            panic!("expected anomaly");
        };
        assert!(anomaly.message.contains("population changed"));
    }

    #[test]
    fn out_of_range_transfer_is_an_anomaly() {
        let balances = [1, 1];
        let result = verify_conservation(1, &balances, &balances, &[Transfer::gift(0, 9)]);
        assert!(!result.is_balanced());
    }

    #[test]
    fn strict_check_passes_for_valid_gifts() {
        let before = [2, 1, 0];
        let after = [1, 0, 2];
        let transfers = [Transfer::gift(0, 2), Transfer::gift(1, 2)];
        let result = verify_conservation_strict(1, &before, &after, &transfers);
        assert_eq!(result, ConservationResult::Balanced);
    }

    #[test]
    fn strict_check_rejects_gift_from_empty_agent() {
        // Agent 0 starts broke, receives a unit, then passes it on. The
        // balances reconcile, but a broke agent must not give.
        let before = [0, 1];
        let after = [0, 1];
        let transfers = [Transfer::gift(1, 0), Transfer::gift(0, 1)];
        assert!(verify_conservation(1, &before, &after, &transfers).is_balanced());

        let result = verify_conservation_strict(1, &before, &after, &transfers);
        let ConservationResult::Anomaly(anomaly) = result else {
            panic!("expected anomaly");
        };
        assert_eq!(anomaly.imbalances.len(), 1);
        assert_eq!(
            anomaly.imbalances.get(&0),
            Some(&AgentImbalance {
                expected: -1,
                actual: 0
            })
        );
    }

    #[test]
    fn anomaly_display_shows_message() {
        let anomaly = LedgerAnomaly {
            tick: 5,
            total_before: 10,
            total_after: 11,
            imbalances: BTreeMap::new(),
            message: "LEDGER_ANOMALY at tick 5: test display".to_owned(),
        };
        let display = format!("{anomaly}");
        assert!(display.contains("LEDGER_ANOMALY"));
        assert!(display.contains("tick 5"));
    }
}

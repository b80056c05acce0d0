//! The redistribution step: one tick of the yard-sale economy.
//!
//! Every agent holding wealth gives one unit away. The recipients are drawn
//! uniformly at random, with replacement, from the whole population, so an
//! agent can give and receive in the same tick and nothing bounds how much
//! a single agent may accumulate. Agents with zero wealth never give.
//!
//! All decrements are applied before any increment. The step works on a
//! scratch copy and swaps it in only on success, so a failed step leaves
//! the input untouched.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;
use yardsale_types::Transfer;

use crate::wealth::{WealthError, WealthVector};

/// What happened during one application of the step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// Number of agents that gave a unit (and therefore recipient draws).
    pub benefactors: usize,
    /// One transfer per benefactor. The j-th benefactor in index order is
    /// paired with the j-th recipient draw.
    pub transfers: Vec<Transfer>,
}

/// Apply one tick, returning the new vector and leaving `wealth` as is.
pub fn step(wealth: &WealthVector, rng: &mut impl Rng) -> Result<WealthVector, WealthError> {
    let mut next = wealth.clone();
    step_in_place(&mut next, rng)?;
    Ok(next)
}

/// Apply one tick to `wealth` in place.
///
/// # Errors
///
/// Returns [`WealthError::Overflow`] if a recipient's balance would pass
/// `u64::MAX`. A validated vector's total fits in a `u64`, so this only
/// guards against vectors assembled outside that invariant.
pub fn step_in_place(
    wealth: &mut WealthVector,
    rng: &mut impl Rng,
) -> Result<StepOutcome, WealthError> {
    let population = wealth.len();
    let mut next = wealth.as_slice().to_vec();

    // Phase 1: every solvent agent gives one unit.
    let mut givers = Vec::new();
    for (agent, balance) in next.iter_mut().enumerate() {
        if *balance > 0 {
            *balance = balance.saturating_sub(1);
            givers.push(agent);
        }
    }

    // Phase 2: one uniform draw per giver.
    let mut transfers = Vec::with_capacity(givers.len());
    for from in givers {
        let to = rng.random_range(0..population);
        let slot = next
            .get_mut(to)
            .ok_or(WealthError::AgentOutOfRange { agent: to, population })?;
        *slot = slot
            .checked_add(1)
            .ok_or(WealthError::Overflow { agent: to })?;
        transfers.push(Transfer::gift(from, to));
    }

    wealth.replace(next);

    let benefactors = transfers.len();
    debug!(population, benefactors, "redistribution step applied");

    Ok(StepOutcome {
        benefactors,
        transfers,
    })
}

/// Build the simulation's random source.
///
/// A configured seed gives a reproducible run; without one the generator
/// is seeded from OS entropy.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    #[test]
    fn step_conserves_total_and_length() {
        let wealth = WealthVector::uniform(100, 100).unwrap();
        let mut rng = rng();
        let mut current = wealth.clone();
        for _ in 0..50 {
            current = step(&current, &mut rng).unwrap();
            assert_eq!(current.len(), 100);
            assert_eq!(current.total(), 10_000);
        }
        // The input is never touched.
        assert_eq!(wealth, WealthVector::uniform(100, 100).unwrap());
    }

    #[test]
    fn all_zero_vector_is_unchanged() {
        let mut wealth = WealthVector::new(vec![0, 0, 0, 0]).unwrap();
        let outcome = step_in_place(&mut wealth, &mut rng()).unwrap();
        assert_eq!(outcome.benefactors, 0);
        assert!(outcome.transfers.is_empty());
        assert_eq!(wealth.as_slice(), &[0, 0, 0, 0]);
    }

    #[test]
    fn only_solvent_agents_give() {
        let mut wealth = WealthVector::new(vec![0, 3, 0, 1, 0]).unwrap();
        let outcome = step_in_place(&mut wealth, &mut rng()).unwrap();
        assert_eq!(outcome.benefactors, 2);
        let givers: Vec<usize> = outcome.transfers.iter().map(|t| t.from).collect();
        assert_eq!(givers, vec![1, 3]);
        assert!(outcome.transfers.iter().all(|t| t.amount == 1 && t.to < 5));
        assert_eq!(wealth.total(), 4);
    }

    #[test]
    fn single_agent_gives_to_itself() {
        let mut wealth = WealthVector::new(vec![5]).unwrap();
        let outcome = step_in_place(&mut wealth, &mut rng()).unwrap();
        assert_eq!(outcome.transfers, vec![Transfer::gift(0, 0)]);
        assert_eq!(wealth.as_slice(), &[5]);
    }

    #[test]
    fn balances_follow_transfers() {
        let before = WealthVector::new(vec![2, 0, 7, 1, 0, 4]).unwrap();
        let mut after = before.clone();
        let outcome = step_in_place(&mut after, &mut rng()).unwrap();

        let mut expected: Vec<i64> = before
            .as_slice()
            .iter()
            .map(|&w| i64::try_from(w).unwrap())
            .collect();
        for t in &outcome.transfers {
            expected[t.from] -= 1;
            expected[t.to] += 1;
        }
        let actual: Vec<i64> = after
            .as_slice()
            .iter()
            .map(|&w| i64::try_from(w).unwrap())
            .collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn same_seed_same_result() {
        let wealth = WealthVector::uniform(50, 20).unwrap();
        let mut a = SmallRng::seed_from_u64(7);
        let mut b = SmallRng::seed_from_u64(7);
        let mut left = wealth.clone();
        let mut right = wealth;
        for _ in 0..20 {
            left = step(&left, &mut a).unwrap();
            right = step(&right, &mut b).unwrap();
        }
        assert_eq!(left, right);
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let mut a = seeded_rng(Some(99));
        let mut b = seeded_rng(Some(99));
        let xs: Vec<u32> = (0..8).map(|_| a.random()).collect();
        let ys: Vec<u32> = (0..8).map(|_| b.random()).collect();
        assert_eq!(xs, ys);
    }
}

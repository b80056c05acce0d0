//! Rank-based group selection.
//!
//! Agents are ranked by wealth with an ascending stable sort, so tied
//! balances keep their index order. A [`Cutoff`] then selects a band of
//! ranks: the top bands take every rank from `floor(n * p / 100)` upward,
//! the bottom bands every rank below it.

use std::ops::Range;

use yardsale_types::Cutoff;

use crate::wealth::WealthVector;

/// Agent indices ordered by ascending wealth, ties broken by index.
pub fn ascending_ranks(wealth: &WealthVector) -> Vec<usize> {
    let balances = wealth.as_slice();
    let mut order: Vec<usize> = (0..balances.len()).collect();
    // `sort_by_key` is stable.
    order.sort_by_key(|&agent| balances.get(agent).copied().unwrap_or_default());
    order
}

/// `floor(population * percentile / 100)` without intermediate overflow.
pub fn rank_threshold(population: usize, percentile: u8) -> usize {
    let p = usize::from(percentile);
    let whole = (population / 100).saturating_mul(p);
    let rest = (population % 100).saturating_mul(p) / 100;
    whole.saturating_add(rest)
}

/// The ranks selected by `cutoff` in a population of `population` agents.
pub fn rank_band(population: usize, cutoff: Cutoff) -> Range<usize> {
    let threshold = rank_threshold(population, cutoff.percentile());
    if cutoff.is_top() {
        threshold..population
    } else {
        0..threshold
    }
}

/// Flag the agents that fall in `cutoff`'s band. The mask is indexed by
/// agent, like the wealth vector.
pub fn rank_mask(wealth: &WealthVector, cutoff: Cutoff) -> Vec<bool> {
    let order = ascending_ranks(wealth);
    let mut mask = vec![false; order.len()];
    let band = rank_band(order.len(), cutoff);
    for &agent in order.get(band).unwrap_or_default() {
        if let Some(flag) = mask.get_mut(agent) {
            *flag = true;
        }
    }
    mask
}

/// Indices of the flagged agents in a mask, ascending.
pub fn members(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter_map(|(agent, &flagged)| flagged.then_some(agent))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    fn wealth(balances: &[u64]) -> WealthVector {
        WealthVector::new(balances.to_vec()).unwrap()
    }

    fn flagged(mask: &[bool]) -> usize {
        mask.iter().filter(|&&f| f).count()
    }

    #[test]
    fn threshold_matches_naive_formula() {
        for n in [1_usize, 4, 9, 10, 11, 99, 100, 101, 250, 499, 500] {
            for cutoff in Cutoff::ALL {
                let p = usize::from(cutoff.percentile());
                assert_eq!(rank_threshold(n, cutoff.percentile()), n * p / 100);
            }
        }
    }

    #[test]
    fn top_ten_flags_ceil_tenth() {
        for n in [1_usize, 5, 10, 11, 19, 100, 101, 500] {
            let v = WealthVector::uniform(n, 3).unwrap();
            let mask = rank_mask(&v, Cutoff::Top10);
            assert_eq!(flagged(&mask), n.div_ceil(10), "n = {n}");
        }
    }

    #[test]
    fn top_ten_picks_richest() {
        let v = wealth(&[5, 90, 1, 7, 3, 8, 2, 6, 4, 0]);
        let mask = rank_mask(&v, Cutoff::Top10);
        assert_eq!(members(&mask), vec![1]);
    }

    #[test]
    fn bottom_twenty_five_picks_poorest() {
        let v = wealth(&[5, 90, 1, 7, 3, 8, 2, 6]);
        // floor(8 * 25 / 100) = 2 agents: the 1 and the 2.
        let mask = rank_mask(&v, Cutoff::Bottom25);
        assert_eq!(members(&mask), vec![2, 6]);
    }

    #[test]
    fn ties_are_broken_by_index() {
        let v = WealthVector::uniform(8, 10).unwrap();
        assert_eq!(ascending_ranks(&v), (0..8).collect::<Vec<_>>());
        assert_eq!(members(&rank_mask(&v, Cutoff::Bottom25)), vec![0, 1]);
        assert_eq!(members(&rank_mask(&v, Cutoff::Top25)), vec![6, 7]);
    }

    #[test]
    fn small_population_bottom_band_can_be_empty() {
        let v = wealth(&[3, 1, 2]);
        assert_eq!(flagged(&rank_mask(&v, Cutoff::Bottom10)), 0);
        assert_eq!(members(&rank_mask(&v, Cutoff::Top10)), vec![0]);
    }

    #[test]
    fn top_and_bottom_bands_partition_the_ranks() {
        let n = 37;
        assert_eq!(rank_band(n, Cutoff::Bottom25).end, rank_threshold(n, 25));
        assert_eq!(rank_band(n, Cutoff::Top25), rank_threshold(n, 75)..n);
        let top = rank_band(n, Cutoff::Top10).len();
        let rest = rank_threshold(n, 90);
        assert_eq!(top + rest, n);
    }
}

//! The two headline statistics: how much the poorer half holds and how
//! much the richest tenth holds.

use yardsale_types::QuantileSummary;

use crate::wealth::WealthVector;

/// Number of agents counted in the bottom half: `floor(n / 2)`.
pub const fn bottom_count(population: usize) -> usize {
    population / 2
}

/// Number of agents counted in the top tenth: `n - floor(9n / 10)`,
/// which equals `ceil(n / 10)`.
pub const fn top_count(population: usize) -> usize {
    population.div_ceil(10)
}

/// Summarize a wealth vector.
///
/// A copy is sorted ascending. The bottom figure sums the first
/// [`bottom_count`] entries and the top figure sums the last
/// [`top_count`] entries. The order of tied balances does not affect
/// either sum.
pub fn summarize(wealth: &WealthVector) -> QuantileSummary {
    let mut sorted = wealth.as_slice().to_vec();
    sorted.sort_unstable();

    let population = sorted.len();
    let top_start = population.saturating_sub(top_count(population));

    QuantileSummary {
        bottom_half: sum(sorted.get(..bottom_count(population)).unwrap_or_default()),
        top_tenth: sum(sorted.get(top_start..).unwrap_or_default()),
        total: wealth.total(),
    }
}

fn sum(balances: &[u64]) -> u64 {
    balances.iter().fold(0_u64, |acc, &w| acc.saturating_add(w))
}

//! Wealth distribution histogram.

use std::num::NonZeroU64;

use rust_decimal::Decimal;
use yardsale_types::{HistogramBin, WealthHistogram};

use crate::wealth::WealthVector;

/// Most bins [`histogram`] will ever build. Wealth past the last of them is
/// counted as overflow.
pub const MAX_BINS: u64 = 100_000;

/// Bin layout for [`histogram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistogramSpec {
    /// Width of every bin.
    pub bin_width: NonZeroU64,
    /// Exclusive upper edge of the last bin.
    pub upper_bound: u64,
}

impl HistogramSpec {
    /// Number of bins needed to cover `[0, upper_bound)`.
    pub const fn bin_count(&self) -> u64 {
        self.upper_bound.div_ceil(self.bin_width.get())
    }

    /// Exclusive upper edge of the bins actually built, which stops short of
    /// `upper_bound` when the layout asks for more than [`MAX_BINS`].
    pub const fn covered_bound(&self) -> u64 {
        let capped = self.bin_width.get().saturating_mul(MAX_BINS);
        if capped < self.upper_bound {
            capped
        } else {
            self.upper_bound
        }
    }
}

/// Bucket the population into fixed-width bins.
///
/// Bins cover `[0, upper_bound)`; the last one is cut short if the bound
/// is not a multiple of the width. Agents at or above the bound land in
/// `overflow`. Probabilities are counts over the whole population, so they
/// sum to one only when nobody overflows. At most [`MAX_BINS`] bins are
/// built whatever the layout asks for.
pub fn histogram(wealth: &WealthVector, spec: HistogramSpec) -> WealthHistogram {
    let width = spec.bin_width.get();
    let bound = spec.covered_bound();
    let bin_count = usize::try_from(spec.bin_count().min(MAX_BINS)).unwrap_or_default();
    let mut counts = vec![0_u64; bin_count];
    let mut overflow = 0_u64;

    for &balance in wealth.as_slice() {
        let slot = if balance < bound {
            balance
                .checked_div(width)
                .and_then(|bin| usize::try_from(bin).ok())
                .and_then(|bin| counts.get_mut(bin))
        } else {
            None
        };
        match slot {
            Some(count) => *count = count.saturating_add(1),
            None => overflow = overflow.saturating_add(1),
        }
    }

    let population = Decimal::from(wealth.len());
    let mut lower = 0_u64;
    let bins = counts
        .into_iter()
        .map(|count| {
            let upper = lower.saturating_add(width).min(bound);
            let bin = HistogramBin {
                lower,
                upper,
                count,
                probability: Decimal::from(count)
                    .checked_div(population)
                    .unwrap_or(Decimal::ZERO),
            };
            lower = upper;
            bin
        })
        .collect();

    WealthHistogram {
        bin_width: width,
        bins,
        overflow,
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;
    use rust_decimal::prelude::*;

    fn spec(width: u64, upper_bound: u64) -> HistogramSpec {
        HistogramSpec {
            bin_width: NonZeroU64::new(width).unwrap(),
            upper_bound,
        }
    }

    #[test]
    fn uniform_population_fills_one_bin() {
        let wealth = WealthVector::uniform(100, 100).unwrap();
        let h = histogram(&wealth, spec(10, 500));
        assert_eq!(h.bins.len(), 50);
        assert_eq!(h.overflow, 0);

        let full: Vec<&HistogramBin> = h.bins.iter().filter(|b| b.count > 0).collect();
        assert_eq!(full.len(), 1);
        assert_eq!(full[0].lower, 100);
        assert_eq!(full[0].upper, 110);
        assert_eq!(full[0].probability, Decimal::ONE);
    }

    #[test]
    fn bins_are_half_open() {
        let wealth = WealthVector::new(vec![0, 9, 10, 19, 20]).unwrap();
        let h = histogram(&wealth, spec(10, 30));
        let counts: Vec<u64> = h.bins.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 2, 1]);
        assert_eq!(h.bins[0].probability, Decimal::from_str("0.4").unwrap());
    }

    #[test]
    fn wealth_at_or_above_bound_overflows() {
        let wealth = WealthVector::new(vec![5, 30, 31, 1000]).unwrap();
        let h = histogram(&wealth, spec(10, 30));
        assert_eq!(h.overflow, 3);
        assert_eq!(h.bins.iter().map(|b| b.count).sum::<u64>(), 1);
        assert_eq!(h.bins[0].probability, Decimal::from_str("0.25").unwrap());
    }

    #[test]
    fn ragged_last_bin_stops_at_bound() {
        let wealth = WealthVector::new(vec![24]).unwrap();
        let h = histogram(&wealth, spec(10, 25));
        assert_eq!(h.bins.len(), 3);
        let last = h.bins.last().unwrap();
        assert_eq!((last.lower, last.upper, last.count), (20, 25, 1));
    }

    #[test]
    fn zero_bound_sends_everyone_to_overflow() {
        let wealth = WealthVector::new(vec![0, 0]).unwrap();
        let h = histogram(&wealth, spec(10, 0));
        assert!(h.bins.is_empty());
        assert_eq!(h.overflow, 2);
    }

    #[test]
    fn oversized_layout_is_capped() {
        let wealth = WealthVector::new(vec![3, 99_999, 100_000, u64::MAX / 2]).unwrap();
        let layout = spec(1, u64::MAX);
        assert_eq!(layout.covered_bound(), MAX_BINS);

        let h = histogram(&wealth, layout);
        assert_eq!(h.bins.len(), usize::try_from(MAX_BINS).unwrap());
        assert_eq!(h.bins.last().unwrap().upper, MAX_BINS);
        assert_eq!(h.bins[3].count, 1);
        assert_eq!(h.overflow, 2);
    }
}

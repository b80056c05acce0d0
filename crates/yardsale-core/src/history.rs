//! Per-tick record of quantile summaries.

use serde::{Deserialize, Serialize};
use yardsale_types::QuantileSummary;

/// Append-only sequence of summaries, one per completed tick.
///
/// Entry `i` describes the state after tick `i + 1`. Nothing is ever
/// dropped, so a long run grows this without bound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<QuantileSummary>,
}

impl History {
    /// An empty history.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Restore a history saved by a previous session.
    pub const fn from_entries(entries: Vec<QuantileSummary>) -> Self {
        Self { entries }
    }

    /// Append the summary of the tick that just completed.
    pub fn push(&mut self, summary: QuantileSummary) {
        self.entries.push(summary);
    }

    /// Number of recorded ticks.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no tick has been recorded yet.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent summary.
    pub fn latest(&self) -> Option<&QuantileSummary> {
        self.entries.last()
    }

    /// All summaries, oldest first.
    pub fn entries(&self) -> &[QuantileSummary] {
        &self.entries
    }

    /// The last `count` summaries, oldest first. Shorter when fewer ticks
    /// were recorded.
    pub fn tail(&self, count: usize) -> &[QuantileSummary] {
        let start = self.entries.len().saturating_sub(count);
        self.entries.get(start..).unwrap_or_default()
    }

    /// Iterate over the summaries, oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, QuantileSummary> {
        self.entries.iter()
    }

    /// Bottom-half sums over time.
    pub fn bottom_series(&self) -> Vec<u64> {
        self.entries.iter().map(|s| s.bottom_half).collect()
    }

    /// Top-tenth sums over time.
    pub fn top_series(&self) -> Vec<u64> {
        self.entries.iter().map(|s| s.top_tenth).collect()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a QuantileSummary;
    type IntoIter = std::slice::Iter<'a, QuantileSummary>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entry(bottom_half: u64, top_tenth: u64) -> QuantileSummary {
        QuantileSummary {
            bottom_half,
            top_tenth,
            total: 100,
        }
    }

    #[test]
    fn new_history_is_empty() {
        let history = History::new();
        assert!(history.is_empty());
        assert!(history.latest().is_none());
        assert!(history.bottom_series().is_empty());
    }

    #[test]
    fn series_follow_push_order() {
        let mut history = History::new();
        history.push(entry(50, 10));
        history.push(entry(48, 12));
        history.push(entry(45, 15));

        assert_eq!(history.len(), 3);
        assert_eq!(history.bottom_series(), vec![50, 48, 45]);
        assert_eq!(history.top_series(), vec![10, 12, 15]);
        assert_eq!(history.latest(), Some(&entry(45, 15)));
        assert_eq!((&history).into_iter().count(), 3);
    }

    #[test]
    fn tail_takes_most_recent_entries() {
        let history = History::from_entries(vec![entry(50, 10), entry(48, 12), entry(45, 15)]);
        assert_eq!(history.tail(2), &[entry(48, 12), entry(45, 15)]);
        assert!(history.tail(0).is_empty());
        assert_eq!(history.tail(10).len(), 3);
    }

    #[test]
    fn serializes_as_a_plain_list() {
        let history = History::from_entries(vec![entry(1, 2)]);
        let json = serde_json::to_value(&history).unwrap();
        assert!(json.is_array());
        let back: History = serde_json::from_value(json).unwrap();
        assert_eq!(back, history);
    }
}

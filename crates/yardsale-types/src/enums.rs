//! Enumeration types for the Yard Sale simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Highlight cutoffs
// ---------------------------------------------------------------------------

/// A percentile band used to highlight a group of agents by wealth rank.
///
/// Each band is identified by the percentile threshold it was keyed on in
/// the group selector: 90 and 75 select the agents ranked at or above that
/// percentile, 25 and 10 select the agents ranked below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Cutoff {
    /// The richest 10% (ranks from the 90th percentile up).
    Top10,
    /// The richest 25% (ranks from the 75th percentile up).
    Top25,
    /// The poorest 25% (ranks below the 25th percentile).
    Bottom25,
    /// The poorest 10% (ranks below the 10th percentile).
    Bottom10,
}

impl Cutoff {
    /// All cutoffs in selector order.
    pub const ALL: [Self; 4] = [Self::Top10, Self::Top25, Self::Bottom25, Self::Bottom10];

    /// The percentile threshold this band is keyed on (90, 75, 25, or 10).
    pub const fn percentile(self) -> u8 {
        match self {
            Self::Top10 => 90,
            Self::Top25 => 75,
            Self::Bottom25 => 25,
            Self::Bottom10 => 10,
        }
    }

    /// Whether the band selects from the top of the ranking.
    pub const fn is_top(self) -> bool {
        matches!(self, Self::Top10 | Self::Top25)
    }

    /// Human-readable label, matching the group selector's wording.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Top10 => "Top 10%",
            Self::Top25 => "Top 25%",
            Self::Bottom25 => "Bottom 25%",
            Self::Bottom10 => "Bottom 10%",
        }
    }
}

impl core::fmt::Display for Cutoff {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// A percentile value that does not name a [`Cutoff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownCutoff(pub u64);

impl core::fmt::Display for UnknownCutoff {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "unknown cutoff percentile {}: expected one of 10, 25, 75, 90",
            self.0
        )
    }
}

impl std::error::Error for UnknownCutoff {}

impl TryFrom<u8> for Cutoff {
    type Error = UnknownCutoff;

    fn try_from(percentile: u8) -> Result<Self, Self::Error> {
        Self::try_from(u64::from(percentile))
    }
}

impl TryFrom<u64> for Cutoff {
    type Error = UnknownCutoff;

    fn try_from(percentile: u64) -> Result<Self, Self::Error> {
        match percentile {
            90 => Ok(Self::Top10),
            75 => Ok(Self::Top25),
            25 => Ok(Self::Bottom25),
            10 => Ok(Self::Bottom10),
            other => Err(UnknownCutoff(other)),
        }
    }
}

impl From<Cutoff> for u8 {
    fn from(cutoff: Cutoff) -> Self {
        cutoff.percentile()
    }
}

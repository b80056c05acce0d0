//! Shared type definitions for the Yard Sale wealth simulation.
//!
//! This crate is the single source of truth for the values that leave the
//! simulation core: summaries, transfers, histograms, and tick snapshots.
//! Types defined here flow downstream to `TypeScript` via `ts-rs` so a
//! dashboard can consume the engine's JSON output without hand-written
//! interfaces.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for run identifiers
//! - [`enums`] -- Highlight cutoffs
//! - [`structs`] -- Quantile summaries, transfers, histograms, snapshots

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{Cutoff, UnknownCutoff};
pub use ids::RunId;
pub use structs::{HistogramBin, QuantileSummary, TickSnapshot, Transfer, WealthHistogram};

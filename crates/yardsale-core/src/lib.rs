//! Wealth redistribution, statistics, and orchestration for the Yard Sale
//! simulation.
//!
//! Every tick, each agent holding wealth gives one unit to a randomly chosen
//! agent. Total wealth never changes, yet the distribution drifts from
//! perfectly equal toward highly concentrated. This crate owns that step,
//! the statistics that track the drift, and the loop that runs it.
//!
//! # Modules
//!
//! - [`wealth`] -- The validated per-agent wealth vector.
//! - [`redistribution`] -- The yard-sale step itself.
//! - [`quantile`] -- Bottom-half and top-tenth wealth sums.
//! - [`grouping`] -- Rank masks for highlighting a wealth band.
//! - [`history`] -- Per-tick summary series.
//! - [`histogram`] -- Fixed-width wealth distribution.
//! - [`clock`] -- Tick counter and snapshot cadence.
//! - [`config`] -- Configuration loading from `yardsale-config.yaml` into
//!   strongly-typed structs.
//! - [`tick`] -- Session state and the per-tick cycle.
//! - [`operator`] -- Shared play/pause/step/stop controls.
//! - [`runner`] -- The async run loop.

pub mod clock;
pub mod config;
pub mod grouping;
pub mod histogram;
pub mod history;
pub mod operator;
pub mod quantile;
pub mod redistribution;
pub mod runner;
pub mod tick;
pub mod wealth;

pub use wealth::{WealthError, WealthVector};

//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and simulation execution.

use crate::output::OutputError;

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: yardsale_core::config::ConfigError,
    },

    /// The session could not be built from the configuration.
    #[error("session error: {source}")]
    Session {
        /// The underlying tick error.
        #[from]
        source: yardsale_core::tick::TickError,
    },

    /// Simulation runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: yardsale_core::runner::RunnerError,
    },

    /// Writing a snapshot to stdout failed.
    #[error("output error: {source}")]
    Output {
        /// The underlying output error.
        #[from]
        source: OutputError,
    },
}

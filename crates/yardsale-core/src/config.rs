//! Configuration loading and typed config structures for the Yard Sale
//! simulation.
//!
//! The canonical configuration lives in `yardsale-config.yaml` at the project
//! root. Every field is optional: a missing section or key falls back to the
//! defaults of the original dashboards (100 agents holding 100 units each,
//! a 10 ms tick, a chart refresh every 10 ticks).

use std::num::NonZeroU64;
use std::path::Path;

use serde::Deserialize;

use crate::histogram::HistogramSpec;

/// Environment variable that overrides `world.seed`.
pub const SEED_ENV_VAR: &str = "YARDSALE_SEED";

/// Upper limit on histogram bins, so a tiny width cannot allocate without
/// bound.
pub const MAX_HISTOGRAM_BINS: u64 = crate::histogram::MAX_BINS;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but describes an impossible run.
    #[error("invalid config: {reason}")]
    Invalid {
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `yardsale-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// World-level settings (name, seed, timing).
    #[serde(default)]
    pub world: WorldConfig,

    /// Population parameters.
    #[serde(default)]
    pub population: PopulationConfig,

    /// Simulation boundary parameters.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,

    /// Snapshot and histogram output.
    #[serde(default)]
    pub output: OutputConfig,

    /// Conservation checking.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `YARDSALE_SEED`, when set, overrides `world.seed`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `YARDSALE_SEED` is set but is not
    /// an unsigned integer.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(raw) = std::env::var(SEED_ENV_VAR) {
            let seed = raw
                .trim()
                .parse::<u64>()
                .map_err(|err| invalid(format!("{SEED_ENV_VAR}={raw:?}: {err}")))?;
            self.world.seed = Some(seed);
        }
        Ok(())
    }

    /// Check the values serde cannot: positive counts and widths, and an
    /// economy whose total wealth fits in a `u64`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world.tick_interval_ms == 0 {
            return Err(invalid("world.tick_interval_ms must be at least 1"));
        }
        if self.population.agent_count == 0 {
            return Err(invalid("population.agent_count must be at least 1"));
        }
        u64::try_from(self.population.agent_count)
            .ok()
            .and_then(|n| n.checked_mul(self.population.initial_wealth))
            .ok_or_else(|| invalid("population total wealth exceeds u64::MAX"))?;
        if self.output.snapshot_interval_ticks == 0 {
            return Err(invalid("output.snapshot_interval_ticks must be at least 1"));
        }

        let spec = self.histogram_spec()?;
        if spec.bin_count() > MAX_HISTOGRAM_BINS {
            return Err(invalid(format!(
                "histogram would have {} bins (limit {MAX_HISTOGRAM_BINS})",
                spec.bin_count()
            )));
        }
        Ok(())
    }

    /// The histogram layout, resolving the default upper bound of five
    /// times the initial wealth.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the bin width is zero.
    pub fn histogram_spec(&self) -> Result<HistogramSpec, ConfigError> {
        let bin_width = NonZeroU64::new(self.output.histogram_bin_width)
            .ok_or_else(|| invalid("output.histogram_bin_width must be at least 1"))?;
        let upper_bound = self.output.histogram_upper_bound.unwrap_or_else(|| {
            self.population
                .initial_wealth
                .saturating_mul(DEFAULT_UPPER_BOUND_FACTOR)
                .max(bin_width.get())
        });
        Ok(HistogramSpec {
            bin_width,
            upper_bound,
        })
    }
}

/// Default histogram upper bound, as a multiple of the initial wealth.
const DEFAULT_UPPER_BOUND_FACTOR: u64 = 5;

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable simulation name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for reproducibility. Unset means OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Real-time milliseconds between ticks while playing.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Whether the run starts paused, waiting for `play` or `step`.
    #[serde(default)]
    pub start_paused: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: None,
            tick_interval_ms: default_tick_interval_ms(),
            start_paused: false,
        }
    }
}

/// Population configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PopulationConfig {
    /// Number of agents. Fixed for the whole run.
    #[serde(default = "default_agent_count")]
    pub agent_count: usize,

    /// Units of wealth every agent starts with.
    #[serde(default = "default_initial_wealth")]
    pub initial_wealth: u64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            agent_count: default_agent_count(),
            initial_wealth: default_initial_wealth(),
        }
    }
}

/// Simulation boundary configuration. Zero means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Stop after this many ticks.
    #[serde(default)]
    pub max_ticks: u64,

    /// Stop after this many seconds of wall-clock time.
    #[serde(default)]
    pub max_real_time_seconds: u64,
}

/// Snapshot output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputConfig {
    /// Emit a snapshot every this many ticks.
    #[serde(default = "default_snapshot_interval_ticks")]
    pub snapshot_interval_ticks: u64,

    /// Width of each histogram bin.
    #[serde(default = "default_histogram_bin_width")]
    pub histogram_bin_width: u64,

    /// Exclusive upper edge of the histogram. Unset means five times the
    /// initial wealth.
    #[serde(default)]
    pub histogram_upper_bound: Option<u64>,

    /// Whether snapshots carry the full per-agent wealth vector.
    #[serde(default = "default_true")]
    pub include_wealth: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            snapshot_interval_ticks: default_snapshot_interval_ticks(),
            histogram_bin_width: default_histogram_bin_width(),
            histogram_upper_bound: None,
            include_wealth: true,
        }
    }
}

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerConfig {
    /// Reconcile every tick's transfers against the wealth vector.
    #[serde(default = "default_true")]
    pub verify_conservation: bool,

    /// Also flag agents that gave more than they held.
    #[serde(default)]
    pub strict: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            verify_conservation: true,
            strict: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines instead of the human-readable format.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    "Yard Sale".to_owned()
}

const fn default_tick_interval_ms() -> u64 {
    10
}

const fn default_agent_count() -> usize {
    100
}

const fn default_initial_wealth() -> u64 {
    100
}

const fn default_snapshot_interval_ticks() -> u64 {
    10
}

const fn default_histogram_bin_width() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.world.seed, None);
        assert_eq!(config.world.tick_interval_ms, 10);
        assert_eq!(config.population.agent_count, 100);
        assert_eq!(config.population.initial_wealth, 100);
        assert_eq!(config.output.snapshot_interval_ticks, 10);
        assert!(config.ledger.verify_conservation);
    }

    #[test]
    fn default_histogram_spans_five_times_initial_wealth() {
        let spec = SimulationConfig::default().histogram_spec().unwrap();
        assert_eq!(spec.bin_width.get(), 10);
        assert_eq!(spec.upper_bound, 500);
        assert_eq!(spec.bin_count(), 50);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
world:
  name: "Five Hundred"
  seed: 123
  tick_interval_ms: 50
  start_paused: true

population:
  agent_count: 500
  initial_wealth: 20

simulation:
  max_ticks: 10000
  max_real_time_seconds: 60

output:
  snapshot_interval_ticks: 25
  histogram_bin_width: 5
  histogram_upper_bound: 200
  include_wealth: false

ledger:
  verify_conservation: true
  strict: true

logging:
  level: "debug"
  json: true
"#;

        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.world.name, "Five Hundred");
        assert_eq!(config.world.seed, Some(123));
        assert!(config.world.start_paused);
        assert_eq!(config.population.agent_count, 500);
        assert_eq!(config.simulation.max_ticks, 10_000);
        assert!(!config.output.include_wealth);
        assert!(config.ledger.strict);
        assert!(config.logging.json);
        assert_eq!(config.histogram_spec().unwrap().upper_bound, 200);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = SimulationConfig::parse("world:\n  seed: 7\n").unwrap();

        // Seed is overridden
        assert_eq!(config.world.seed, Some(7));
        // Everything else uses defaults
        assert_eq!(config.population.agent_count, 100);
        assert_eq!(config.output.histogram_bin_width, 10);
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(SimulationConfig::parse("").is_ok());
    }

    #[test]
    fn zero_agents_is_rejected() {
        let err = SimulationConfig::parse("population:\n  agent_count: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn zero_bin_width_is_rejected() {
        let err = SimulationConfig::parse("output:\n  histogram_bin_width: 0\n").unwrap_err();
        assert!(err.to_string().contains("histogram_bin_width"));
    }

    #[test]
    fn zero_snapshot_interval_is_rejected() {
        let err = SimulationConfig::parse("output:\n  snapshot_interval_ticks: 0\n").unwrap_err();
        assert!(err.to_string().contains("snapshot_interval_ticks"));
    }

    #[test]
    fn oversized_economy_is_rejected() {
        let yaml = "population:\n  agent_count: 4\n  initial_wealth: 18446744073709551615\n";
        assert!(SimulationConfig::parse(yaml).is_err());
    }

    #[test]
    fn too_many_bins_are_rejected() {
        let yaml = "output:\n  histogram_bin_width: 1\n  histogram_upper_bound: 1000000000\n";
        assert!(SimulationConfig::parse(yaml).is_err());
    }

    #[test]
    fn negative_values_fail_to_parse() {
        let err = SimulationConfig::parse("population:\n  initial_wealth: -5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("yardsale-config.yaml");
        if path.exists() {
            let config = SimulationConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}

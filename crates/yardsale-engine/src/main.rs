//! Headless engine binary for the Yard Sale simulation.
//!
//! Loads configuration, builds a session, and runs the simulation loop
//! until a limit is hit or the operator stops it. Snapshots stream to
//! stdout as JSON lines; logs go to stderr.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `yardsale-config.yaml` (or `YARDSALE_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the session and the random source
//! 4. Create operator state and wire stdin and Ctrl-C to it
//! 5. Write the initial snapshot
//! 6. Run the simulation loop
//! 7. Write the final snapshot and log the result

mod control;
mod error;
mod output;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use yardsale_core::config::{LoggingConfig, SimulationConfig};
use yardsale_core::operator::OperatorState;
use yardsale_core::redistribution;
use yardsale_core::runner;
use yardsale_core::tick::SimulationState;

use crate::error::EngineError;
use crate::output::SnapshotWriter;

/// Config file looked up in the working directory.
const DEFAULT_CONFIG_PATH: &str = "yardsale-config.yaml";

/// Environment variable naming an alternative config file.
const CONFIG_PATH_ENV_VAR: &str = "YARDSALE_CONFIG";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!(
        world_name = config.world.name,
        seed = ?config.world.seed,
        agents = config.population.agent_count,
        initial_wealth = config.population.initial_wealth,
        tick_interval_ms = config.world.tick_interval_ms,
        "Configuration loaded"
    );

    // 3. Build the session.
    let mut state = SimulationState::new(&config).map_err(EngineError::from)?;
    let mut rng = redistribution::seeded_rng(config.world.seed);

    // 4. Create operator state and its inputs.
    let operator = Arc::new(OperatorState::new(
        config.world.tick_interval_ms,
        config.world.start_paused,
        &config.simulation,
    ));
    let _stdin = control::spawn_stdin(Arc::clone(&operator));
    let _ctrl_c = control::spawn_ctrl_c(Arc::clone(&operator));

    // 5. Initial snapshot.
    let mut writer = SnapshotWriter::new(std::io::stdout());
    writer.write_current(&state).map_err(EngineError::from)?;

    // 6. Run the simulation.
    let result = runner::run_simulation(&mut state, &operator, &mut writer, &mut rng)
        .await
        .map_err(EngineError::from)?;

    // 7. Final snapshot and results.
    writer.write_final(&state).map_err(EngineError::from)?;
    runner::log_simulation_end(&result);

    info!(
        run_id = %state.run_id,
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        dropped_snapshots = writer.failures(),
        "yardsale-engine shutdown complete"
    );

    // The stdin task may still be parked on a read; leave without it.
    std::process::exit(0);
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` wins over `logging.level`. Output goes to stderr so stdout
/// stays a clean snapshot stream.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if config.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Load the simulation configuration.
///
/// Reads the file named by `YARDSALE_CONFIG`, else `yardsale-config.yaml`
/// in the working directory, else falls back to defaults. Runs before
/// logging is up, so nothing here logs.
fn load_config() -> Result<SimulationConfig, EngineError> {
    let path = std::env::var_os(CONFIG_PATH_ENV_VAR)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let explicit = std::env::var_os(CONFIG_PATH_ENV_VAR).is_some();

    if explicit || path.exists() {
        Ok(SimulationConfig::from_file(&path)?)
    } else {
        let mut config = SimulationConfig::default();
        config.apply_env_overrides()?;
        Ok(config)
    }
}

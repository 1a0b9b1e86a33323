//! Headless simulation binary for Evolve.
//!
//! This is the main entry point that wires together configuration, the
//! board, the task scheduler, and a demo scenario. It runs the bounded tick
//! loop until a termination condition is met.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `evolve-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing), text or JSON
//! 3. Seed the scenario RNG from `world.seed`
//! 4. Build the board, scheduler, and scenario tasks
//! 5. Run the simulation loop with the snapshot callback
//! 6. Log the result

mod error;
mod scenarios;
mod snapshot_callback;
mod spawner;

use std::path::Path;

use evolve_core::config::{LogFormat, LoggingConfig, SimulationConfig};
use evolve_core::runner::{self, RunBounds};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::snapshot_callback::SnapshotCallback;

/// Config file read from the working directory.
const CONFIG_PATH: &str = "evolve-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("evolve-engine starting");
    if !from_file {
        info!("Config file not found, using defaults");
    }
    info!(
        world_name = config.world.name,
        seed = config.world.seed,
        tick_delta_ms = config.world.tick_delta_ms,
        tick_interval_ms = config.world.tick_interval_ms,
        "Configuration loaded"
    );

    // 3. Seed the scenario RNG.
    let mut rng = StdRng::seed_from_u64(config.world.seed);

    // 4. Build the scenario.
    let mut scheduler = scenarios::build(&config, &mut rng)?;
    info!(
        scenario = ?config.scenario.kind,
        agents = scheduler.board().len(),
        tasks = scheduler.tasks().len(),
        sectors = scheduler.board().sectors_number(),
        "Scenario ready"
    );

    // 5. Run the simulation loop.
    let bounds = RunBounds::from_config(&config);
    let mut callback = SnapshotCallback::new(config.logging.snapshot_interval_ticks);
    let result = runner::run_simulation(&mut scheduler, bounds, &mut callback)
        .await
        .map_err(EngineError::from)?;

    // 6. Log the result.
    runner::log_simulation_end(&result);
    debug!(board = %scheduler.board(), "Final board");
    info!(snapshots = callback.emitted(), "evolve-engine shut down");

    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}

/// Load configuration from `evolve-config.yaml`, falling back to defaults.
///
/// The flag reports whether the file was found. Environment overrides apply
/// either way.
fn load_config() -> Result<(SimulationConfig, bool), EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        let config = SimulationConfig::from_file(config_path)?;
        Ok((config, true))
    } else {
        let mut config = SimulationConfig::default();
        config.apply_env_overrides();
        Ok((config, false))
    }
}

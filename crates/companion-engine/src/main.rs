//! Engine binary for the companion simulation.
//!
//! Wires configuration, the demo scenario and the tick loop together and
//! runs until a termination condition is met.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `companion-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Spawn the demo scenario
//! 4. Create operator state and hook Ctrl-C to a clean stop
//! 5. Run the simulation loop
//! 6. Log the result

mod error;
mod spawner;
mod summary_callback;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use companion_core::config::SimulationConfig;
use companion_core::operator::OperatorState;
use companion_core::runner;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::summary_callback::SummaryCallback;

/// Default config file, relative to the working directory.
const DEFAULT_CONFIG: &str = "companion-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = std::env::var("COMPANION_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);
    let config = load_config(&config_path)?;

    // 2. Initialize structured logging.
    let default_level = config.logging.level.clone();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(true)
        .init();

    info!(
        world_name = config.world.name,
        seed = config.world.seed,
        tick_interval_ms = config.world.tick_interval_ms,
        local_peer = config.peer.local_peer,
        config = %config_path.display(),
        "companion-engine starting"
    );

    // 3. Spawn the demo scenario.
    let mut sim_state = spawner::spawn_demo(&config)?;

    // 4. Create operator state.
    let operator = Arc::new(OperatorState::new(
        config.world.tick_interval_ms,
        &config.simulation,
    ));
    {
        let operator = Arc::clone(&operator);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received, stopping after the current tick");
                    operator.request_stop();
                }
                Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
            }
        });
    }

    let mut callback = SummaryCallback::new(config.simulation.summary_interval);

    // 5. Run the simulation.
    let result = runner::run_simulation(&mut sim_state, &operator, &mut callback)
        .await
        .map_err(EngineError::from)?;

    // 6. Log results.
    runner::log_simulation_end(&result);

    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        products_total = callback.products_total(),
        "companion-engine shutdown complete"
    );

    Ok(())
}

/// Load the simulation configuration, falling back to defaults when the
/// file does not exist.
fn load_config(path: &Path) -> Result<SimulationConfig, EngineError> {
    if path.exists() {
        Ok(SimulationConfig::from_file(path)?)
    } else {
        Ok(SimulationConfig::default())
    }
}

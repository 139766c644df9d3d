//! Engine binary for the Kingdoms simulation.
//!
//! # Startup Sequence
//!
//! 1. Locate and load the configuration (`KINGDOMS_CONFIG`, then
//!    `kingdoms-config.yaml`, then built-in defaults)
//! 2. Initialize structured logging (tracing)
//! 3. Run the simulation to completion
//! 4. Log the result

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use kingdoms_core::config::LoggingConfig;
use kingdoms_core::{LogFormat, SimulationConfig, SimulationEndReason, TracingSink};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Environment variable naming the configuration file.
const CONFIG_ENV: &str = "KINGDOMS_CONFIG";

/// Configuration file looked up in the working directory.
const DEFAULT_CONFIG_PATH: &str = "kingdoms-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration is unusable or the run fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration. Logging is not up yet, so remember where it
    //    came from and report it afterwards.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    if let Some(path) = &source {
        info!(path = %path.display(), "Configuration loaded");
    } else {
        info!("Config file not found, using defaults");
    }
    let [first, second] = &config.world.kingdom_names;
    info!(
        seed = ?config.world.seed,
        first = %first,
        second = %second,
        grace_period_ms = config.war.grace_period_ms,
        max_duration_ms = config.war.max_duration_ms,
        "kingdoms-engine starting"
    );

    // 3. Run the simulation.
    let result = kingdoms_core::run_simulation(&config, Arc::new(TracingSink)).await?;

    // 4. Report the outcome.
    match &result.end_reason {
        SimulationEndReason::Conquest(victory) => info!(
            winner = %victory.winner_name,
            loser = %victory.loser_name,
            battles = victory.battles,
            "The war is over"
        ),
        SimulationEndReason::TimeLimit => info!(
            battles = result.battles,
            "The war ran out of time without a victor"
        ),
    }
    Ok(())
}

/// Find and load the configuration.
///
/// Returns the path that was read, or `None` when defaults were used. A path
/// named by `KINGDOMS_CONFIG` must exist; the default path is optional.
fn load_config() -> Result<(SimulationConfig, Option<PathBuf>), EngineError> {
    if let Some(path) = std::env::var_os(CONFIG_ENV).map(PathBuf::from) {
        let config = SimulationConfig::from_file(&path)?;
        return Ok((config, Some(path)));
    }

    let path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if path.exists() {
        let config = SimulationConfig::from_file(&path)?;
        Ok((config, Some(path)))
    } else {
        // Still honour KINGDOMS_SEED and validation.
        Ok((SimulationConfig::parse("{}")?, None))
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    match logging.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

//! Headless engine binary for the Firefly simulation.
//!
//! Loads configuration, builds the engine, mounts it on an in-memory
//! surface and runs the frame loop until a termination condition is met.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `firefly-config.yaml` (or `FIREFLY_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Apply environment overrides (`FIREFLY_SEED`, `FIREFLY_MAX_FRAMES`)
//! 4. Build the engine and mount it on a headless surface
//! 5. Create operator state; wire ctrl-c and the stdin command feed
//! 6. Run the frame loop
//! 7. Log the result and final statistics, then tear down

mod command_feed;
mod error;
mod status_callback;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use firefly_core::config::{LogFormat, LoggingConfig};
use firefly_core::runner::{self, FrameClock};
use firefly_core::{
    Engine, HeadlessSurface, MountSurface, OperatorCommand, OperatorResponse, OperatorState,
    SimulationConfig,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::status_callback::StatusCallback;

/// Default configuration file, relative to the working directory.
const CONFIG_FILE: &str = "firefly-config.yaml";

/// Frames between status lines.
const STATUS_EVERY: u64 = 300;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, engine construction or the run fails.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (mut config, source) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("firefly-engine starting");
    match &source {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Config file not found, using defaults"),
    }

    // 3. Environment overrides.
    apply_overrides(&mut config)?;
    info!(
        seed = config.engine.seed,
        population_initial = config.population.initial,
        population_min = config.population.min,
        population_max = config.population.max,
        frame_interval_ms = config.engine.frame_interval_ms,
        max_frames = config.simulation.max_frames,
        "Configuration resolved"
    );

    // 4. Build and mount the engine.
    let mut engine = Engine::new(config).map_err(EngineError::from)?;
    let surface = HeadlessSurface::new();
    engine
        .mount(Box::new(surface.clone()))
        .map_err(EngineError::from)?;
    for entry in engine.plugins().entries() {
        tracing::debug!(
            section = %entry.section,
            name = %entry.name,
            status = ?entry.status,
            "Plugin"
        );
    }

    // 5. Operator state, ctrl-c, command feed.
    let operator = Arc::new(OperatorState::new(
        engine.config().engine.frame_interval_ms,
        &engine.config().simulation,
    ));
    info!(
        max_frames = operator.max_frames(),
        max_real_time_seconds = operator.max_real_time_seconds(),
        frame_interval_ms = operator.frame_interval_ms(),
        "Operator state initialized"
    );
    {
        let operator = Arc::clone(&operator);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, stopping");
                operator.request_stop();
            }
        });
    }
    command_feed::spawn_stdin(Arc::clone(&operator));

    // 6. Run.
    let mut callback = StatusCallback::new(STATUS_EVERY);
    let result = runner::run(&mut engine, &operator, FrameClock::Wall, &mut callback)
        .await
        .map_err(EngineError::from)?;

    // 7. Report and tear down.
    runner::log_run_end(&result);
    if let Some((lowest, highest)) = callback.population_range() {
        info!(lowest, highest, "Population range");
    }
    if let OperatorResponse::Statistics { report } =
        engine.execute(OperatorCommand::ReadStatistics)
    {
        match serde_json::to_string(&report) {
            Ok(json) => info!(report = %json, "Final statistics"),
            Err(e) => warn!(error = %e, "Failed to serialize statistics"),
        }
    }

    engine.destroy();
    info!(
        end_reason = ?result.end_reason,
        total_frames = result.total_frames,
        achievements = callback.unlocked().len(),
        elapsed_seconds = operator.elapsed_seconds(),
        finished_at = %Utc::now().to_rfc3339(),
        residual_elements = surface.element_count(),
        "firefly-engine shutdown complete"
    );

    Ok(())
}

/// Install the tracing subscriber. `RUST_LOG` wins over the configured
/// level.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_unset| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Load the configuration from `FIREFLY_CONFIG` or `firefly-config.yaml`.
///
/// A missing file means defaults; a file that exists but does not parse
/// is an error. Returns the path actually read.
fn load_config() -> Result<(SimulationConfig, Option<PathBuf>), EngineError> {
    let path = std::env::var_os("FIREFLY_CONFIG")
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    if Path::new(&path).exists() {
        let config = SimulationConfig::from_file(&path)?;
        Ok((config, Some(path)))
    } else {
        Ok((SimulationConfig::default(), None))
    }
}

/// Apply `FIREFLY_SEED` and `FIREFLY_MAX_FRAMES`.
fn apply_overrides(config: &mut SimulationConfig) -> Result<(), EngineError> {
    if let Some(seed) = env_u64("FIREFLY_SEED")? {
        info!(seed, "Seed overridden from environment");
        config.engine.seed = seed;
    }
    if let Some(max_frames) = env_u64("FIREFLY_MAX_FRAMES")? {
        info!(max_frames, "Frame limit overridden from environment");
        config.simulation.max_frames = max_frames;
    }
    Ok(())
}

fn env_u64(name: &'static str) -> Result<Option<u64>, EngineError> {
    std::env::var(name)
        .ok()
        .map(|value| parse_u64(name, &value))
        .transpose()
}

fn parse_u64(name: &'static str, value: &str) -> Result<u64, EngineError> {
    value
        .trim()
        .parse()
        .map_err(|_invalid| EngineError::Override {
            name,
            value: value.to_owned(),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn overrides_parse_trimmed_integers() {
        assert_eq!(parse_u64("FIREFLY_SEED", " 99 ").unwrap(), 99);
        assert!(matches!(
            parse_u64("FIREFLY_MAX_FRAMES", "lots"),
            Err(EngineError::Override { name: "FIREFLY_MAX_FRAMES", .. })
        ));
    }
}

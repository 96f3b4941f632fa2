//! Engine binary for the Counterline queue simulation.
//!
//! Loads configuration, builds the first engine, optionally starts the
//! Observer API, and drives the run loop until it drains, hits its step
//! bound, or an operator stops it.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `counterline-config.yaml` (or the path in
//!    `COUNTERLINE_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the simulation engine from the queue parameters
//! 4. Create operator state from the runner settings
//! 5. Start the Observer API server when enabled
//! 6. Run the loop
//! 7. Log the result and verification checks
//! 8. Keep serving the final state until Ctrl-C when the observer is up

mod error;
mod observer_callback;

use std::path::Path;
use std::sync::Arc;

use counterline_core::config::{CounterlineConfig, LoggingConfig};
use counterline_core::engine::SimulationEngine;
use counterline_core::operator::OperatorState;
use counterline_core::runner::{self, StepCallback};
use counterline_observer::startup::{ServerConfig, spawn_observer};
use counterline_observer::state::AppState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::observer_callback::ObserverCallback;

const DEFAULT_CONFIG_PATH: &str = "counterline-config.yaml";
const CONFIG_PATH_ENV: &str = "COUNTERLINE_CONFIG";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, engine construction, the observer
/// startup, or the run loop fails.
#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("counterline-engine starting");
    info!(
        servers = config.queue.servers,
        arrival_rate = config.queue.arrival_rate,
        customers = config.queue.customers,
        service_time = config.queue.service_time,
        step_interval_ms = config.runner.step_interval_ms,
        observer = config.observer.enabled,
        "Configuration loaded"
    );

    // 3. Build the engine.
    config.queue.validate().map_err(EngineError::from)?;
    let mut engine = SimulationEngine::new(&config.queue).map_err(EngineError::from)?;

    // 4. Operator state. Without an observer nobody can press play or
    //    reset, so the headless loop always autoplays and exits on drain.
    let headless = !config.observer.enabled;
    let operator = Arc::new(OperatorState::new(
        config.runner.step_interval_ms,
        config.runner.max_steps,
    ));
    if headless && (!config.runner.autoplay || !config.runner.exit_on_completion) {
        warn!("Observer disabled; ignoring autoplay=false and exit_on_completion=false");
    }
    if !config.runner.autoplay && !headless {
        operator.pause();
    }
    let exit_on_completion = config.runner.exit_on_completion || headless;
    info!(
        max_steps = operator.max_steps(),
        step_interval_ms = operator.step_interval_ms(),
        paused = operator.is_paused(),
        exit_on_completion,
        "Operator state initialized"
    );

    // 5. Observer API server.
    let app_state = Arc::new(AppState::with_operator(Arc::clone(&operator)));
    let observer_handle = if headless {
        None
    } else {
        let server = ServerConfig {
            host: config.observer.host.clone(),
            port: config.observer.port,
        };
        let observer = spawn_observer(&server, Arc::clone(&app_state))
            .await
            .map_err(EngineError::from)?;
        info!(addr = %observer.addr, "Observer API server started");
        Some(observer.handle)
    };

    let mut callback = ObserverCallback::new(app_state);
    callback.on_reset(&engine);

    // 6. Run.
    let result = runner::run_simulation(&mut engine, &operator, &mut callback, exit_on_completion)
        .await
        .map_err(EngineError::from)?;
    callback.publish(&engine).await;

    // 7. Log results.
    runner::log_simulation_end(&result, &engine.verify());

    // 8. Keep the final state visible to dashboards.
    if let Some(handle) = observer_handle {
        info!("Run loop ended; observer still serving, press Ctrl-C to exit");
        tokio::signal::ctrl_c().await.map_err(EngineError::from)?;
        handle.abort();
    }

    info!(
        end_reason = ?result.end_reason,
        steps = result.steps,
        resets = result.resets,
        "counterline-engine shutdown complete"
    );

    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load configuration from `COUNTERLINE_CONFIG` or `counterline-config.yaml`
/// in the working directory. A missing default file means defaults.
fn load_config() -> Result<CounterlineConfig, EngineError> {
    if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
        return Ok(CounterlineConfig::from_file(Path::new(&explicit))?);
    }

    let path = Path::new(DEFAULT_CONFIG_PATH);
    if path.exists() {
        Ok(CounterlineConfig::from_file(path)?)
    } else {
        // Tracing is not up yet.
        eprintln!("{DEFAULT_CONFIG_PATH} not found, using defaults");
        Ok(CounterlineConfig::parse("")?)
    }
}

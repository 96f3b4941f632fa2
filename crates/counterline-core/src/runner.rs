//! Run loop with operator controls.
//!
//! [`run_simulation`] drives a [`SimulationEngine`] one step at a time:
//!
//! - **Pacing**: sleeps the operator's step interval between steps. The
//!   interval only paces presentation; simulation time is unaffected.
//! - **Pause/resume**: a paused loop waits without stepping.
//! - **Reset**: replaces the engine with a fresh one between steps.
//! - **Bounds**: stops after `max_steps` steps of the current run.
//! - **Drain**: ends the loop, or pauses until reset/stop when the caller
//!   asks to keep the run open.
//! - **Operator stop**: ends the loop before the next step.

use std::sync::Arc;

use counterline_types::{EngineSnapshot, EventRecord};
use tracing::{error, info, warn};

use crate::engine::{SimulationEngine, StepOutcome};
use crate::error::SimulationError;
use crate::operator::{OperatorState, ResetRequest, SimulationEndReason};

/// Errors that can end the run loop abnormally.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A step found the engine state inconsistent.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying engine error.
        #[from]
        source: SimulationError,
    },
}

/// Result of a completed run loop.
#[derive(Debug)]
pub struct SimulationResult {
    /// Why the loop ended.
    pub end_reason: SimulationEndReason,
    /// Snapshot of the engine at the end.
    pub final_snapshot: EngineSnapshot,
    /// Steps taken in the final run.
    pub steps: u64,
    /// Resets applied during the loop.
    pub resets: u64,
}

/// Callback invoked as the loop progresses.
///
/// Implementations update observer state, broadcast step summaries, etc.
pub trait StepCallback: Send {
    /// Called after each dispatched event.
    fn on_step(&mut self, event: &EventRecord, engine: &SimulationEngine);

    /// Called after a reset installs a new engine.
    fn on_reset(&mut self, _engine: &SimulationEngine) {}
}

/// A no-op callback for headless runs and tests.
pub struct NoOpCallback;

impl StepCallback for NoOpCallback {
    fn on_step(&mut self, _event: &EventRecord, _engine: &SimulationEngine) {}
}

/// Run the loop until a termination condition is met.
///
/// # Arguments
///
/// * `engine` - The engine to drive. Resets replace it in place.
/// * `operator` - Shared operator control state.
/// * `callback` - Called after each step and each reset.
/// * `exit_on_completion` - End the loop when the event list drains. When
///   false, a drained run pauses and waits for a reset or stop.
///
/// # Errors
///
/// Returns [`RunnerError`] if a step reports an inconsistent engine
/// state.
pub async fn run_simulation(
    engine: &mut SimulationEngine,
    operator: &Arc<OperatorState>,
    callback: &mut dyn StepCallback,
    exit_on_completion: bool,
) -> Result<SimulationResult, RunnerError> {
    let mut steps: u64 = 0;
    let mut resets: u64 = 0;

    info!(
        run_id = %engine.run_id(),
        max_steps = operator.max_steps(),
        step_interval_ms = operator.step_interval_ms(),
        paused = operator.is_paused(),
        "Run loop starting"
    );

    loop {
        // --- Apply pending reset ---
        if let Some(request) = operator.take_reset().await {
            if apply_reset(engine, operator, request) {
                steps = 0;
                resets = resets.saturating_add(1);
                callback.on_reset(engine);
            }
            continue;
        }

        // --- Check stop request ---
        if operator.is_stop_requested() {
            info!("Operator stop requested");
            return Ok(finish(engine, operator, SimulationEndReason::OperatorStop, steps, resets).await);
        }

        // --- Check pause ---
        if operator.is_paused() {
            info!("Run loop paused, waiting for operator");
            operator.wait_while_paused().await;
            continue;
        }

        // --- Execute step ---
        match engine.try_step()? {
            StepOutcome::Processed(event) => {
                steps = steps.saturating_add(1);
                callback.on_step(&event, engine);

                if operator.step_limit_reached(steps) {
                    info!(steps, max_steps = operator.max_steps(), "Step limit reached");
                    let reason = SimulationEndReason::MaxStepsReached;
                    return Ok(finish(engine, operator, reason, steps, resets).await);
                }
            }
            StepOutcome::Drained => {
                if exit_on_completion {
                    return Ok(finish(engine, operator, SimulationEndReason::Drained, steps, resets).await);
                }
                info!("Run drained, pausing until reset or stop");
                operator.pause();
                continue;
            }
        }

        // --- Sleep for step interval ---
        let interval_ms = operator.step_interval_ms();
        if interval_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(interval_ms)).await;
        }
    }
}

/// Build a replacement engine. Returns whether the swap happened.
///
/// A fresh run starts paused and waits for `play`. A rejected reset
/// leaves the current engine and the pause state untouched.
fn apply_reset(
    engine: &mut SimulationEngine,
    operator: &OperatorState,
    request: ResetRequest,
) -> bool {
    let config = request.queue.unwrap_or_else(|| engine.config().clone());
    match SimulationEngine::new(&config) {
        Ok(fresh) => {
            info!(
                previous_run = %engine.run_id(),
                run_id = %fresh.run_id(),
                "Engine reset"
            );
            *engine = fresh;
            operator.pause();
            true
        }
        Err(e) => {
            error!(error = %e, "Reset rejected, keeping current run");
            false
        }
    }
}

async fn finish(
    engine: &SimulationEngine,
    operator: &OperatorState,
    reason: SimulationEndReason,
    steps: u64,
    resets: u64,
) -> SimulationResult {
    operator.set_end_reason(reason).await;
    SimulationResult {
        end_reason: reason,
        final_snapshot: engine.snapshot(),
        steps,
        resets,
    }
}

/// Log the end of the run loop and the verification lines.
pub fn log_simulation_end(result: &SimulationResult, verification: &[String]) {
    let snap = &result.final_snapshot;
    info!(
        reason = ?result.end_reason,
        run_id = %snap.run_id,
        steps = result.steps,
        resets = result.resets,
        end_time = snap.current_time,
        served = snap.served_count,
        average_wait = snap.average_wait,
        cumulative_utilization = snap.cumulative_utilization,
        "Simulation ended"
    );
    for line in verification {
        info!(check = %line, "Verification");
    }
    if snap.events_processed == 0 {
        warn!("Simulation ended with no events processed");
    }
}

//! Operator REST API handlers for runtime simulation control.
//!
//! Commands are recorded on the shared [`OperatorState`] and applied by
//! the run loop between steps.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/operator/play` | Resume stepping |
//! | `POST` | `/api/operator/pause` | Pause stepping |
//! | `POST` | `/api/operator/speed` | Set step interval (ms) |
//! | `POST` | `/api/operator/reset` | Start a new run |
//! | `POST` | `/api/operator/stop` | End the run loop |
//! | `GET` | `/api/operator/status` | Current loop status |
//!
//! [`OperatorState`]: counterline_core::operator::OperatorState

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use counterline_core::config::QueueConfig;
use counterline_core::operator::{
    MAX_STEP_INTERVAL_MS, MIN_STEP_INTERVAL_MS, OperatorState, ResetRequest, SimulationStatus,
};
use counterline_types::{SchedulerKind, ServiceMode};
use tracing::info;

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/operator/speed`.
#[derive(Debug, serde::Deserialize)]
pub struct SetSpeedRequest {
    /// New step interval in milliseconds (10 to 2000).
    pub step_interval_ms: u64,
}

/// Request body for `POST /api/operator/reset`.
///
/// Every field is optional. An empty body rebuilds the current run from
/// its own configuration; any field given is applied on top of the
/// current run's parameters and a fresh seed is drawn unless `seed` is set.
#[derive(Debug, Default, serde::Deserialize)]
pub struct ResetBody {
    /// Number of server slots.
    pub servers: Option<u32>,
    /// Mean arrivals per unit time.
    pub arrival_rate: Option<f64>,
    /// Number of customers.
    pub customers: Option<u64>,
    /// Service duration or mean.
    pub service_time: Option<f64>,
    /// Service duration mode.
    pub service_mode: Option<ServiceMode>,
    /// Future-event-list backend.
    pub scheduler: Option<SchedulerKind>,
    /// Random seed.
    pub seed: Option<u64>,
}

impl ResetBody {
    const fn is_empty(&self) -> bool {
        self.servers.is_none()
            && self.arrival_rate.is_none()
            && self.customers.is_none()
            && self.service_time.is_none()
            && self.service_mode.is_none()
            && self.scheduler.is_none()
            && self.seed.is_none()
    }

    fn apply_to(&self, mut config: QueueConfig) -> QueueConfig {
        if let Some(v) = self.servers {
            config.servers = v;
        }
        if let Some(v) = self.arrival_rate {
            config.arrival_rate = v;
        }
        if let Some(v) = self.customers {
            config.customers = v;
        }
        if let Some(v) = self.service_time {
            config.service_time = v;
        }
        if let Some(v) = self.service_mode {
            config.service_mode = v;
        }
        if let Some(v) = self.scheduler {
            config.scheduler = v;
        }
        config.seed = self.seed;
        config
    }
}

/// Generic success response.
#[derive(Debug, serde::Serialize)]
struct OperatorResponse {
    /// Whether the operation succeeded.
    ok: bool,
    /// Human-readable message.
    message: String,
}

fn operator(state: &AppState) -> Result<&Arc<OperatorState>, ObserverError> {
    state
        .operator_state
        .as_ref()
        .ok_or_else(|| ObserverError::Internal("operator state not available".to_owned()))
}

// ---------------------------------------------------------------------------
// POST /api/operator/play
// ---------------------------------------------------------------------------

/// Resume stepping after a pause.
pub async fn play(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.resume();

    Ok(Json(OperatorResponse {
        ok: true,
        message: "Simulation running".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/operator/pause
// ---------------------------------------------------------------------------

/// Pause stepping. State is kept as is until play, reset, or stop.
pub async fn pause(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.pause();

    Ok(Json(OperatorResponse {
        ok: true,
        message: "Simulation paused".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/operator/speed
// ---------------------------------------------------------------------------

/// Change the step interval. Takes effect before the next sleep.
pub async fn set_speed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetSpeedRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let operator = operator(&state)?;

    operator.set_step_interval_ms(body.step_interval_ms).map_or_else(
        || {
            Err(ObserverError::InvalidRequest(format!(
                "step_interval_ms must be between {MIN_STEP_INTERVAL_MS} and {MAX_STEP_INTERVAL_MS}"
            )))
        },
        |prev| {
            Ok(Json(serde_json::json!({
                "ok": true,
                "message": format!("Step interval changed from {prev}ms to {}ms", body.step_interval_ms),
                "previous_interval_ms": prev,
                "new_interval_ms": body.step_interval_ms,
            })))
        },
    )
}

// ---------------------------------------------------------------------------
// POST /api/operator/reset
// ---------------------------------------------------------------------------

/// Queue a reset. The run loop builds the new engine before its next step
/// and keeps its paused or running state.
///
/// Parameters are validated here so a bad request never reaches the loop.
pub async fn reset(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResetBody>,
) -> Result<impl IntoResponse, ObserverError> {
    let operator = operator(&state)?;

    let queue = if body.is_empty() {
        None
    } else {
        let base = state
            .observed
            .read()
            .await
            .engine
            .as_ref()
            .map_or_else(QueueConfig::default, |snap| {
                QueueConfig::from_params(&snap.params, None)
            });
        let config = body.apply_to(base);
        config
            .validate()
            .map_err(|e| ObserverError::InvalidRequest(e.to_string()))?;
        Some(config)
    };

    info!(?queue, "Operator requested reset");
    operator.request_reset(ResetRequest { queue }).await;

    Ok(Json(OperatorResponse {
        ok: true,
        message: "Reset queued".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/operator/stop
// ---------------------------------------------------------------------------

/// End the run loop. The HTTP server keeps serving the final state.
pub async fn stop(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.request_stop();

    Ok(Json(OperatorResponse {
        ok: true,
        message: "Stop requested -- the loop ends before its next step".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// GET /api/operator/status
// ---------------------------------------------------------------------------

/// Return pause state, speed, progress, and end reason.
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let operator = operator(&state)?;

    let (events_processed, current_time, finished) = state
        .observed
        .read()
        .await
        .engine
        .as_ref()
        .map_or((0, 0.0, false), |s| {
            (s.events_processed, s.current_time, s.finished)
        });

    let status = SimulationStatus {
        events_processed,
        current_time,
        paused: operator.is_paused(),
        stop_requested: operator.is_stop_requested(),
        reset_pending: operator.is_reset_pending(),
        step_interval_ms: operator.step_interval_ms(),
        max_steps: operator.max_steps(),
        finished,
        elapsed_seconds: operator.elapsed_seconds(),
        end_reason: operator.end_reason().await,
        started_at: operator.started_at().to_rfc3339(),
    };

    Ok(Json(status))
}

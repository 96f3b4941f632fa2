//! REST API endpoint handlers for the Observer server.
//!
//! All handlers read from the [`ObservedState`](crate::state::ObservedState)
//! held in [`AppState`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/snapshot` | Current engine snapshot |
//! | `GET` | `/api/history` | Per-step history series |
//! | `GET` | `/api/verify` | Verification lines and checks |
//! | `GET` | `/api/events` | Recent dispatched events |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse};
use counterline_types::EngineSnapshot;

use crate::error::ObserverError;
use crate::state::{AppState, RECENT_EVENTS_CAPACITY};

/// Query parameters for the `GET /api/events` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct EventsQuery {
    /// Maximum number of events to return, newest first (default 50).
    pub limit: Option<usize>,
}

const DEFAULT_EVENTS_LIMIT: usize = 50;

/// Values shown on the status page.
#[derive(Default)]
struct Headline {
    finished: bool,
    time: f64,
    queue: u64,
    served: u64,
    customers: u64,
    avg_wait: f64,
    util: f64,
    cum_util: f64,
    steps: u64,
}

impl Headline {
    fn from_snapshot(snapshot: Option<&EngineSnapshot>) -> Self {
        snapshot.map_or_else(Self::default, |s| Self {
            finished: s.finished,
            time: s.current_time,
            queue: s.queue_length,
            served: s.served_count,
            customers: s.params.customers,
            avg_wait: s.average_wait,
            util: s.instant_utilization,
            cum_util: s.cumulative_utilization,
            steps: s.events_processed,
        })
    }
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page with the headline metrics and API links.
#[allow(clippy::too_many_lines)]
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let observed = state.observed.read().await;

    let h = Headline::from_snapshot(observed.engine.as_ref());
    let paused = state
        .operator_state
        .as_ref()
        .is_some_and(|op| op.is_paused());
    let status = match (h.finished, observed.engine.is_some(), paused) {
        (true, _, _) => "FINISHED",
        (false, false, _) => "WAITING",
        (false, true, true) => "PAUSED",
        (false, true, false) => "RUNNING",
    };
    let Headline {
        time,
        queue,
        served,
        customers,
        avg_wait,
        util,
        cum_util,
        steps,
        ..
    } = h;

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Counterline Observer</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        a:hover {{ text-decoration: underline; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Counterline Observer</h1>
    <p class="subtitle">Multi-server queue simulation</p>

    <p>Status: <span class="status">{status}</span></p>

    <div>
        <div class="metric">
            <div class="label">Time</div>
            <div class="value">{time:.2}</div>
        </div>
        <div class="metric">
            <div class="label">Queue</div>
            <div class="value">{queue}</div>
        </div>
        <div class="metric">
            <div class="label">Served</div>
            <div class="value">{served}/{customers}</div>
        </div>
        <div class="metric">
            <div class="label">Avg Wait</div>
            <div class="value">{avg_wait:.2}</div>
        </div>
        <div class="metric">
            <div class="label">Utilization</div>
            <div class="value">{util:.2}</div>
        </div>
        <div class="metric">
            <div class="label">Cumulative</div>
            <div class="value">{cum_util:.2}</div>
        </div>
        <div class="metric">
            <div class="label">Events</div>
            <div class="value">{steps}</div>
        </div>
    </div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li>GET <a href="/api/snapshot">/api/snapshot</a> -- Current engine state</li>
        <li>GET <a href="/api/history">/api/history</a> -- Time, queue, and utilization series</li>
        <li>GET <a href="/api/verify">/api/verify</a> -- Verification checks</li>
        <li>GET <a href="/api/events">/api/events</a> -- Recent events (?limit=N)</li>
        <li>GET <a href="/api/operator/status">/api/operator/status</a> -- Run loop status</li>
        <li>POST /api/operator/play | pause | speed | reset | stop</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li><code>ws://host:port/ws/steps</code> -- Live step stream</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/snapshot
// ---------------------------------------------------------------------------

/// Return the latest engine snapshot, or 404 before the first publish.
pub async fn get_snapshot(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let observed = state.observed.read().await;
    observed
        .engine
        .clone()
        .map(Json)
        .ok_or_else(|| ObserverError::NotFound("no run has been published yet".to_owned()))
}

// ---------------------------------------------------------------------------
// GET /api/history
// ---------------------------------------------------------------------------

/// Return the four per-step history series of the current run.
pub async fn get_history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let observed = state.observed.read().await;
    Json(observed.history.clone())
}

// ---------------------------------------------------------------------------
// GET /api/verify
// ---------------------------------------------------------------------------

/// Return verification checks both as rendered lines and structured.
pub async fn get_verify(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let observed = state.observed.read().await;
    let lines: Vec<String> = observed
        .verification
        .iter()
        .map(ToString::to_string)
        .collect();
    let all_passed = observed.verification.iter().all(|c| c.passed);

    Ok(Json(serde_json::json!({
        "lines": lines,
        "checks": serde_json::to_value(&observed.verification)?,
        "all_passed": all_passed,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/events
// ---------------------------------------------------------------------------

/// Return the most recent dispatched events, newest first.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVENTS_LIMIT)
        .min(RECENT_EVENTS_CAPACITY);
    let observed = state.observed.read().await;
    let events: Vec<_> = observed
        .recent_events
        .iter()
        .rev()
        .take(limit)
        .copied()
        .collect();
    Json(events)
}

//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, operator, ws};

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/steps` -- `WebSocket` step stream
/// - `GET /api/snapshot` -- current engine snapshot
/// - `GET /api/history` -- history series
/// - `GET /api/verify` -- verification checks
/// - `GET /api/events` -- recent events
/// - `POST /api/operator/{play,pause,speed,reset,stop}` and
///   `GET /api/operator/status` -- run loop control
///
/// CORS allows any origin so a locally served dashboard can connect.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/steps", get(ws::ws_steps))
        // REST API
        .route("/api/snapshot", get(handlers::get_snapshot))
        .route("/api/history", get(handlers::get_history))
        .route("/api/verify", get(handlers::get_verify))
        .route("/api/events", get(handlers::list_events))
        // Operator
        .route("/api/operator/play", post(operator::play))
        .route("/api/operator/pause", post(operator::pause))
        .route("/api/operator/speed", post(operator::set_speed))
        .route("/api/operator/reset", post(operator::reset))
        .route("/api/operator/stop", post(operator::stop))
        .route("/api/operator/status", get(operator::status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! `WebSocket` step stream.
//!
//! Clients connect to `GET /ws/steps`. The first frame is a `snapshot` of
//! the run as currently observed, so a dashboard opened mid-run has
//! something to draw before the next event. After that each dispatched
//! event arrives as a `step` frame. A client that falls behind the
//! broadcast buffer is sent a fresh `snapshot` and continues from the
//! newest step.
//!
//! Frames are JSON objects tagged by `type`:
//!
//! ```json
//! {"type":"snapshot","run_id":"...","current_time":6.0,...}
//! {"type":"step","run_id":"...","step":4,"time":6.0,"kind":"departure",...}
//! ```

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use counterline_types::EngineSnapshot;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::{AppState, StepBroadcast};

/// One message on the step stream.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFrame {
    /// Full engine view, sent on connect and after a lag.
    Snapshot(EngineSnapshot),
    /// Summary of one dispatched event.
    Step(StepBroadcast),
}

impl StreamFrame {
    fn to_message(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(json) => Some(Message::Text(json.into())),
            Err(e) => {
                warn!(error = %e, "Dropping unserializable stream frame");
                None
            }
        }
    }
}

/// The frame a client sees first, if anything has been published yet.
pub async fn snapshot_frame(state: &AppState) -> Option<StreamFrame> {
    state
        .observed
        .read()
        .await
        .engine
        .clone()
        .map(StreamFrame::Snapshot)
}

/// Upgrade to a `WebSocket` and start streaming.
///
/// # Route
///
/// `GET /ws/steps`
pub async fn ws_steps(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| stream_steps(socket, state))
}

/// Whether the connection should stay open.
enum Flow {
    Continue,
    Close,
}

async fn stream_steps(mut socket: WebSocket, state: Arc<AppState>) {
    // Subscribe before reading the snapshot so no step falls in between.
    let mut rx = state.subscribe();
    debug!("Step stream client connected");

    if let Some(frame) = snapshot_frame(&state).await
        && let Flow::Close = send(&mut socket, &frame).await
    {
        return;
    }

    loop {
        let flow = tokio::select! {
            received = rx.recv() => match received {
                Ok(step) => send(&mut socket, &StreamFrame::Step(step)).await,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Step stream client lagged, resyncing");
                    match snapshot_frame(&state).await {
                        Some(frame) => send(&mut socket, &frame).await,
                        None => Flow::Continue,
                    }
                }
                Err(RecvError::Closed) => Flow::Close,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Ping(data))) => {
                    if socket.send(Message::Pong(data)).await.is_ok() {
                        Flow::Continue
                    } else {
                        Flow::Close
                    }
                }
                Some(Ok(Message::Close(_)) | Err(_)) | None => Flow::Close,
                // The stream is one-way; other client frames are ignored.
                Some(Ok(_)) => Flow::Continue,
            },
        };
        if let Flow::Close = flow {
            debug!("Step stream client disconnected");
            return;
        }
    }
}

async fn send(socket: &mut WebSocket, frame: &StreamFrame) -> Flow {
    let Some(message) = frame.to_message() else {
        return Flow::Continue;
    };
    if socket.send(message).await.is_ok() {
        Flow::Continue
    } else {
        Flow::Close
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use counterline_core::config::QueueConfig;
    use counterline_core::engine::SimulationEngine;

    use super::*;

    fn engine() -> SimulationEngine {
        let config = QueueConfig {
            servers: 1,
            customers: 2,
            ..QueueConfig::default()
        };
        SimulationEngine::from_arrival_times(&config, &[1.0, 2.0]).unwrap()
    }

    #[tokio::test]
    async fn nothing_to_send_before_first_publish() {
        let state = AppState::new();
        assert!(snapshot_frame(&state).await.is_none());
    }

    #[tokio::test]
    async fn connect_frame_is_the_observed_snapshot() {
        let state = AppState::new();
        let mut engine = engine();
        engine.step();
        state.observed.write().await.reset_from(&engine);

        let frame = snapshot_frame(&state).await.unwrap();
        assert_eq!(frame, StreamFrame::Snapshot(engine.snapshot()));
    }

    #[test]
    fn frames_are_tagged_by_type() {
        let mut engine = engine();
        engine.step();
        let event = engine.last_event().unwrap();

        let step = serde_json::to_value(StreamFrame::Step(StepBroadcast::from_step(&event, &engine)))
            .unwrap();
        assert_eq!(step["type"], "step");
        assert_eq!(step["step"], 1);
        assert_eq!(step["kind"], "arrival");

        let snapshot = serde_json::to_value(StreamFrame::Snapshot(engine.snapshot())).unwrap();
        assert_eq!(snapshot["type"], "snapshot");
        assert_eq!(snapshot["events_processed"], 1);
    }
}

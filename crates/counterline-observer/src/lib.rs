//! Observer API server for the Counterline simulation.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/steps`) streaming one summary per
//!   dispatched event via [`tokio::sync::broadcast`]
//! - **REST endpoints** for the current snapshot, the history series,
//!   verification checks, and recent events
//! - **Operator REST endpoints** for play, pause, speed, reset, stop, and
//!   status
//! - **Minimal HTML dashboard** (`GET /`) with the headline metrics
//!
//! # Architecture
//!
//! The observer never touches the engine. The run loop's callback copies
//! what the endpoints need into an [`ObservedState`] behind an `RwLock`
//! after each step, and pushes a [`StepBroadcast`] to every `WebSocket`
//! client. Operator commands go through the shared
//! [`OperatorState`](counterline_core::operator::OperatorState) and are
//! applied by the loop between steps.

pub mod error;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod startup;
pub mod state;
pub mod ws;

pub use router::build_router;
pub use startup::{RunningObserver, ServerConfig, StartupError, spawn_observer};
pub use state::{AppState, ObservedState, RunCapture, StepBroadcast};

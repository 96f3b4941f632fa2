//! Event engine, metrics, and run loop for the Counterline queue simulation.
//!
//! A run schedules every customer's arrival up front, then advances one
//! event at a time: arrivals take an idle server or join the waiting line,
//! service starts record the wait, and service ends free the slot for the
//! head of the line.
//!
//! # Modules
//!
//! - [`clock`] -- Simulation clock that only moves forward.
//! - [`config`] -- Loading `counterline-config.yaml` into typed structs.
//! - [`conservation`] -- Customer accounting checks.
//! - [`engine`] -- [`SimulationEngine`] and the single-event step.
//! - [`error`] -- [`SimulationError`].
//! - [`metrics`] -- Wait totals, busy time, and per-step history series.
//! - [`operator`] -- Pause, resume, speed, reset, and stop controls.
//! - [`runner`] -- Async paced loop that drives an engine to completion.
//! - [`servers`] -- Fixed pool of server slots.
//! - [`waiting_line`] -- FIFO line of customers waiting for a slot.
//!
//! [`SimulationEngine`]: engine::SimulationEngine
//! [`SimulationError`]: error::SimulationError

pub mod clock;
pub mod config;
pub mod conservation;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod operator;
pub mod runner;
pub mod servers;
pub mod waiting_line;

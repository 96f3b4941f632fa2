//! Operator control state for runtime simulation management.
//!
//! Shared between the run loop and the observer's operator endpoints.
//! The operator can pause and resume stepping, change the step interval,
//! request a reset with new queue parameters, and stop the loop.
//!
//! # Architecture
//!
//! Flags and the interval are atomics so the run loop reads them without
//! locking. One [`Notify`] wakes a paused loop for any command that needs
//! attention (resume, reset, stop).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};

use crate::config::QueueConfig;

/// Smallest accepted step interval, in milliseconds.
pub const MIN_STEP_INTERVAL_MS: u64 = 10;

/// Largest accepted step interval, in milliseconds.
pub const MAX_STEP_INTERVAL_MS: u64 = 2_000;

/// Reason the run loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationEndReason {
    /// The future-event list drained.
    Drained,
    /// Reached the configured `max_steps` limit.
    MaxStepsReached,
    /// An operator issued a stop command.
    OperatorStop,
}

/// A pending reset.
#[derive(Debug, Clone, PartialEq)]
pub struct ResetRequest {
    /// Parameters for the new run. `None` rebuilds from the current run's
    /// configuration.
    pub queue: Option<QueueConfig>,
}

/// Shared operator control state.
#[derive(Debug)]
pub struct OperatorState {
    /// Whether stepping is paused.
    paused: AtomicBool,

    /// Wakes the run loop out of a pause.
    wake: Notify,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Current step interval in milliseconds.
    step_interval_ms: AtomicU64,

    /// Wall-clock time the operator state was created.
    started_at: DateTime<Utc>,

    /// Maximum steps per run (0 = unlimited).
    max_steps: u64,

    /// Reset waiting to be applied by the run loop.
    pending_reset: Mutex<Option<ResetRequest>>,

    /// Set while `pending_reset` holds a request.
    reset_pending: AtomicBool,

    /// Reason the loop ended, if it has.
    end_reason: Mutex<Option<SimulationEndReason>>,
}

impl OperatorState {
    /// Create operator state with the given initial interval and step
    /// bound. An initial interval of 0 runs flat out; the bounds only
    /// apply to runtime changes.
    pub fn new(step_interval_ms: u64, max_steps: u64) -> Self {
        Self {
            paused: AtomicBool::new(false),
            wake: Notify::new(),
            stop_requested: AtomicBool::new(false),
            step_interval_ms: AtomicU64::new(step_interval_ms),
            started_at: Utc::now(),
            max_steps,
            pending_reset: Mutex::new(None),
            reset_pending: AtomicBool::new(false),
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Check whether stepping is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause stepping. The run loop sleeps until resumed.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume stepping and wake the run loop.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.wake.notify_one();
    }

    /// Wait while paused.
    ///
    /// Returns as soon as the pause is lifted, or a reset or stop is
    /// requested, whichever comes first.
    pub async fn wait_while_paused(&self) {
        while self.is_paused() && !self.is_stop_requested() && !self.is_reset_pending() {
            self.wake.notified().await;
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean stop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Record the reason the loop ended.
    pub async fn set_end_reason(&self, reason: SimulationEndReason) {
        let mut guard = self.end_reason.lock().await;
        *guard = Some(reason);
    }

    /// Get the reason the loop ended, if it has.
    pub async fn end_reason(&self) -> Option<SimulationEndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Reset
    // -----------------------------------------------------------------------

    /// Queue a reset. A later request replaces an unapplied earlier one.
    pub async fn request_reset(&self, request: ResetRequest) {
        let mut guard = self.pending_reset.lock().await;
        *guard = Some(request);
        self.reset_pending.store(true, Ordering::Release);
        drop(guard);
        self.wake.notify_one();
    }

    /// Check whether a reset is waiting to be applied.
    pub fn is_reset_pending(&self) -> bool {
        self.reset_pending.load(Ordering::Acquire)
    }

    /// Take the pending reset, if any.
    pub async fn take_reset(&self) -> Option<ResetRequest> {
        if !self.is_reset_pending() {
            return None;
        }
        let mut guard = self.pending_reset.lock().await;
        self.reset_pending.store(false, Ordering::Release);
        guard.take()
    }

    // -----------------------------------------------------------------------
    // Step Speed
    // -----------------------------------------------------------------------

    /// Get the current step interval in milliseconds.
    pub fn step_interval_ms(&self) -> u64 {
        self.step_interval_ms.load(Ordering::Acquire)
    }

    /// Set the step interval. Must lie within
    /// [`MIN_STEP_INTERVAL_MS`]..=[`MAX_STEP_INTERVAL_MS`].
    ///
    /// Returns the previous interval, or `None` if the value was rejected.
    pub fn set_step_interval_ms(&self, ms: u64) -> Option<u64> {
        if !(MIN_STEP_INTERVAL_MS..=MAX_STEP_INTERVAL_MS).contains(&ms) {
            return None;
        }
        Some(self.step_interval_ms.swap(ms, Ordering::AcqRel))
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// Whether `steps` has reached the per-run step limit.
    pub const fn step_limit_reached(&self, steps: u64) -> bool {
        self.max_steps > 0 && steps >= self.max_steps
    }

    /// Get the configured max steps.
    pub const fn max_steps(&self) -> u64 {
        self.max_steps
    }

    /// Return the wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Return elapsed seconds since start.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }
}

/// JSON-serializable status for the operator API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationStatus {
    /// Events processed in the current run.
    pub events_processed: u64,
    /// Current simulation time.
    pub current_time: f64,
    /// Whether stepping is paused.
    pub paused: bool,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Whether a reset is waiting to be applied.
    pub reset_pending: bool,
    /// Current step interval in milliseconds.
    pub step_interval_ms: u64,
    /// Configured maximum steps per run (0 = unlimited).
    pub max_steps: u64,
    /// Whether the current run's event list has drained.
    pub finished: bool,
    /// Elapsed wall-clock seconds since start.
    pub elapsed_seconds: u64,
    /// The reason the loop ended, if applicable.
    pub end_reason: Option<SimulationEndReason>,
    /// ISO 8601 timestamp of when the operator state was created.
    pub started_at: String,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn initial_state_is_not_paused() {
        let state = OperatorState::new(500, 0);
        assert!(!state.is_paused());
        assert!(!state.is_stop_requested());
        assert!(!state.is_reset_pending());
    }

    #[test]
    fn pause_and_resume() {
        let state = OperatorState::new(500, 0);
        state.pause();
        assert!(state.is_paused());
        state.resume();
        assert!(!state.is_paused());
    }

    #[test]
    fn stop_request() {
        let state = OperatorState::new(500, 0);
        state.request_stop();
        assert!(state.is_stop_requested());
    }

    #[test]
    fn set_step_interval_within_bounds() {
        let state = OperatorState::new(500, 0);
        assert_eq!(state.set_step_interval_ms(10), Some(500));
        assert_eq!(state.set_step_interval_ms(2_000), Some(10));
        assert_eq!(state.step_interval_ms(), 2_000);
    }

    #[test]
    fn reject_out_of_range_interval() {
        let state = OperatorState::new(500, 0);
        assert!(state.set_step_interval_ms(9).is_none());
        assert!(state.set_step_interval_ms(2_001).is_none());
        assert_eq!(state.step_interval_ms(), 500);
    }

    #[test]
    fn step_limit_zero_means_unlimited() {
        let state = OperatorState::new(500, 0);
        assert!(!state.step_limit_reached(1_000_000));
    }

    #[test]
    fn step_limit_reached() {
        let state = OperatorState::new(500, 10);
        assert!(!state.step_limit_reached(9));
        assert!(state.step_limit_reached(10));
    }

    #[tokio::test]
    async fn reset_is_taken_once() {
        let state = OperatorState::new(500, 0);
        state
            .request_reset(ResetRequest {
                queue: Some(QueueConfig::default()),
            })
            .await;
        assert!(state.is_reset_pending());
        let taken = state.take_reset().await;
        assert!(taken.is_some_and(|r| r.queue.is_some()));
        assert!(state.take_reset().await.is_none());
        assert!(!state.is_reset_pending());
    }

    #[tokio::test]
    async fn end_reason_roundtrip() {
        let state = OperatorState::new(500, 0);
        assert!(state.end_reason().await.is_none());
        state.set_end_reason(SimulationEndReason::Drained).await;
        assert_eq!(state.end_reason().await, Some(SimulationEndReason::Drained));
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_running() {
        let state = OperatorState::new(500, 0);
        let waited = tokio::time::timeout(Duration::from_millis(200), state.wait_while_paused()).await;
        assert!(waited.is_ok());
    }

    #[tokio::test]
    async fn paused_wait_wakes_on_resume() {
        let state = Arc::new(OperatorState::new(500, 0));
        state.pause();
        let waiter = {
            let state = Arc::clone(&state);
            tokio::spawn(async move { state.wait_while_paused().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        state.resume();
        let joined = tokio::time::timeout(Duration::from_secs(2), waiter).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn paused_wait_wakes_on_stop() {
        let state = Arc::new(OperatorState::new(500, 0));
        state.pause();
        let waiter = {
            let state = Arc::clone(&state);
            tokio::spawn(async move { state.wait_while_paused().await })
        };
        state.request_stop();
        let joined = tokio::time::timeout(Duration::from_secs(2), waiter).await;
        assert!(matches!(joined, Ok(Ok(()))));
        assert!(state.is_paused());
    }
}

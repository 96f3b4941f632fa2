//! Step callback that updates the Observer API state.
//!
//! After each step this callback pushes a [`StepBroadcast`] to every
//! connected `WebSocket` client and folds the step into the shared
//! [`ObservedState`](counterline_observer::state::ObservedState).
//!
//! The run loop never waits on the observer lock. When a handler holds
//! it, the step is captured and handed to a background task that applies
//! the newest capture once the lock frees up.

use std::sync::Arc;

use counterline_core::engine::SimulationEngine;
use counterline_core::runner::StepCallback;
use counterline_observer::state::{AppState, RunCapture, StepBroadcast};
use counterline_types::EventRecord;
use tokio::sync::watch;
use tracing::debug;

/// Callback that bridges the run loop to the Observer API.
pub struct ObserverCallback {
    state: Arc<AppState>,
    deferred: watch::Sender<Option<RunCapture>>,
}

impl ObserverCallback {
    /// Create a new observer callback backed by the given app state.
    ///
    /// Spawns the deferred publisher, so this must run inside a Tokio
    /// runtime. The publisher exits when the callback is dropped.
    pub fn new(state: Arc<AppState>) -> Self {
        let (deferred, rx) = watch::channel(None);
        tokio::spawn(apply_deferred(Arc::clone(&state), rx));
        Self { state, deferred }
    }

    /// Publish the engine's current state, waiting for the lock.
    ///
    /// Called once the loop has returned so the last step is never lost.
    pub async fn publish(&self, engine: &SimulationEngine) {
        let capture = RunCapture::from_engine(engine);
        let applied = self.state.observed.write().await.apply_capture(capture);
        debug!(run_id = %engine.run_id(), applied, "Final state published");
    }

    fn defer(&self, engine: &SimulationEngine) {
        self.deferred
            .send_replace(Some(RunCapture::from_engine(engine)));
    }
}

impl StepCallback for ObserverCallback {
    fn on_step(&mut self, event: &EventRecord, engine: &SimulationEngine) {
        let summary = StepBroadcast::from_step(event, engine);
        let receivers = self.state.broadcast(&summary);
        debug!(step = summary.step, receivers, "Step broadcast sent");

        if let Ok(mut observed) = self.state.observed.try_write() {
            observed.record_step(event, engine);
        } else {
            self.defer(engine);
        }
    }

    fn on_reset(&mut self, engine: &SimulationEngine) {
        // Always deferred too, so a pending capture of the old run is
        // superseded and can never land after this one.
        if let Ok(mut observed) = self.state.observed.try_write() {
            observed.reset_from(engine);
        } else {
            debug!(run_id = %engine.run_id(), "Observer busy, deferring reset publish");
        }
        self.defer(engine);
    }
}

/// Apply deferred captures until the callback goes away.
async fn apply_deferred(state: Arc<AppState>, mut rx: watch::Receiver<Option<RunCapture>>) {
    while rx.changed().await.is_ok() {
        let Some(capture) = rx.borrow_and_update().clone() else {
            continue;
        };
        let mut observed = state.observed.write().await;
        // A reset deferred while waiting for the lock supersedes this run.
        let superseded = rx
            .borrow()
            .as_ref()
            .is_some_and(|latest| latest.run_id() != capture.run_id());
        if !superseded {
            observed.apply_capture(capture);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use counterline_core::config::QueueConfig;

    use super::*;

    fn engine(seed: u64) -> SimulationEngine {
        let config = QueueConfig {
            servers: 2,
            customers: 5,
            seed: Some(seed),
            ..QueueConfig::default()
        };
        SimulationEngine::new(&config).unwrap()
    }

    #[tokio::test]
    async fn steps_are_published_and_broadcast() {
        let state = Arc::new(AppState::new());
        let mut rx = state.subscribe();
        let mut callback = ObserverCallback::new(Arc::clone(&state));

        let mut engine = engine(8);
        callback.on_reset(&engine);
        while engine.step() {
            let event = engine.last_event().unwrap();
            callback.on_step(&event, &engine);
        }

        let observed = state.observed.read().await;
        assert_eq!(&observed.history, engine.history());
        assert_eq!(observed.engine.as_ref().unwrap().served_count, 5);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.step, 1);
        assert_eq!(first.run_id, engine.run_id());
    }

    #[tokio::test]
    async fn last_step_published_under_contention_is_not_lost() {
        let state = Arc::new(AppState::new());
        let mut callback = ObserverCallback::new(Arc::clone(&state));
        let config = QueueConfig {
            servers: 1,
            customers: 2,
            ..QueueConfig::default()
        };
        let mut engine = SimulationEngine::from_arrival_times(&config, &[1.0, 2.0]).unwrap();
        callback.on_reset(&engine);

        let reader = state.observed.read().await;
        while engine.step() {
            let event = engine.last_event().unwrap();
            callback.on_step(&event, &engine);
        }
        assert!(reader.engine.as_ref().is_none_or(|snap| !snap.finished));
        drop(reader);

        for _ in 0..50 {
            tokio::task::yield_now().await;
            if state
                .observed
                .read()
                .await
                .engine
                .as_ref()
                .is_some_and(|snap| snap.finished)
            {
                break;
            }
        }
        let observed = state.observed.read().await;
        let snap = observed.engine.as_ref().unwrap();
        assert!(snap.finished);
        assert_eq!(snap.served_count, 2);
        assert_eq!(observed.history.len(), 6);
        assert_eq!(observed.recent_events.back(), engine.last_event().as_ref());
    }

    #[tokio::test]
    async fn final_publish_waits_for_the_lock() {
        let state = Arc::new(AppState::new());
        let mut callback = ObserverCallback::new(Arc::clone(&state));
        let mut engine = engine(4);
        callback.on_reset(&engine);

        let reader = Arc::clone(&state.observed).read_owned().await;
        while engine.step() {
            let event = engine.last_event().unwrap();
            callback.on_step(&event, &engine);
        }
        let release = tokio::spawn(async move {
            tokio::task::yield_now().await;
            drop(reader);
        });

        callback.publish(&engine).await;
        release.await.unwrap();
        let observed = state.observed.read().await;
        assert!(observed.engine.as_ref().unwrap().finished);
        assert_eq!(&observed.history, engine.history());
    }

    #[tokio::test]
    async fn reset_replaces_observed_run() {
        let state = Arc::new(AppState::new());
        let mut callback = ObserverCallback::new(Arc::clone(&state));

        let mut first = engine(1);
        callback.on_reset(&first);
        first.step();
        let event = first.last_event().unwrap();
        callback.on_step(&event, &first);

        let second = engine(2);
        callback.on_reset(&second);

        let observed = state.observed.read().await;
        assert_eq!(observed.engine.as_ref().unwrap().run_id, second.run_id());
        assert!(observed.history.is_empty());
        assert!(observed.recent_events.is_empty());
    }
}

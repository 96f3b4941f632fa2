//! Shared application state for the Observer API server.
//!
//! [`AppState`] holds the broadcast channel for step summaries and the
//! [`ObservedState`] copy of the run that the REST endpoints serve.

use std::collections::VecDeque;
use std::sync::Arc;

use counterline_core::engine::SimulationEngine;
use counterline_core::operator::OperatorState;
use counterline_types::{
    EngineSnapshot, EventKind, EventRecord, HistorySeries, RunId, SubjectId, VerificationCheck,
};
use tokio::sync::{RwLock, broadcast};

/// Capacity of the broadcast channel for step summaries.
///
/// A subscriber that falls behind by more than this many messages gets
/// [`broadcast::error::RecvError::Lagged`] and skips to the newest one.
const BROADCAST_CAPACITY: usize = 256;

/// Number of dispatched events kept for `GET /api/events`.
pub const RECENT_EVENTS_CAPACITY: usize = 200;

/// JSON-serializable step summary pushed over the `WebSocket`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StepBroadcast {
    /// Run the step belongs to.
    pub run_id: RunId,
    /// Steps dispatched so far in this run.
    pub step: u64,
    /// Simulation time of the event.
    pub time: f64,
    /// Kind of the dispatched event.
    pub kind: EventKind,
    /// Subject of the dispatched event.
    pub subject: SubjectId,
    /// Waiting line length after the event.
    pub queue_length: u64,
    /// Occupied server slots after the event.
    pub busy_servers: u64,
    /// Subjects that have completed service.
    pub served_count: u64,
    /// Fraction of slots occupied after the event.
    pub utilization: f64,
    /// Cumulative utilization after the event.
    pub cumulative_utilization: f64,
    /// Whether the event list drained with this step.
    pub finished: bool,
}

impl StepBroadcast {
    /// Summarize the event the engine just dispatched.
    pub fn from_step(event: &EventRecord, engine: &SimulationEngine) -> Self {
        let snapshot = engine.snapshot();
        let busy = snapshot.servers.iter().filter(|slot| slot.is_some()).count();
        Self {
            run_id: snapshot.run_id,
            step: snapshot.events_processed,
            time: event.time,
            kind: event.kind,
            subject: event.subject,
            queue_length: snapshot.queue_length,
            busy_servers: u64::try_from(busy).unwrap_or(u64::MAX),
            served_count: snapshot.served_count,
            utilization: snapshot.instant_utilization,
            cumulative_utilization: snapshot.cumulative_utilization,
            finished: snapshot.finished,
        }
    }
}

/// What the observer knows about the current run.
///
/// Updated by the run loop's callback after each step and each reset.
#[derive(Debug, Clone, Default)]
pub struct ObservedState {
    /// Latest engine projection. `None` until the first publish.
    pub engine: Option<EngineSnapshot>,
    /// History series of the current run.
    pub history: HistorySeries,
    /// Verification checks as of the latest publish.
    pub verification: Vec<VerificationCheck>,
    /// Most recent dispatched events, newest last.
    pub recent_events: VecDeque<EventRecord>,
}

impl ObservedState {
    /// Replace everything with a fresh view of `engine`.
    pub fn reset_from(&mut self, engine: &SimulationEngine) {
        self.engine = Some(engine.snapshot());
        self.history = engine.history().clone();
        self.verification = engine.verification_checks();
        self.recent_events.clear();
    }

    /// Record one dispatched event.
    ///
    /// History samples are appended from where this copy left off, so a
    /// publish skipped under lock contention is caught up on the next one.
    pub fn record_step(&mut self, event: &EventRecord, engine: &SimulationEngine) {
        let same_run = self
            .engine
            .as_ref()
            .is_some_and(|snap| snap.run_id == engine.run_id());
        if same_run {
            catch_up(&mut self.history, engine.history());
            self.engine = Some(engine.snapshot());
            self.verification = engine.verification_checks();
        } else {
            self.reset_from(engine);
        }

        if self.recent_events.len() >= RECENT_EVENTS_CAPACITY {
            self.recent_events.pop_front();
        }
        self.recent_events.push_back(*event);
    }
}

/// Owned copy of everything [`ObservedState`] shows about a run.
///
/// Taken on the run loop, applied later from another task when the
/// observed state is busy.
#[derive(Debug, Clone)]
pub struct RunCapture {
    snapshot: EngineSnapshot,
    history: HistorySeries,
    verification: Vec<VerificationCheck>,
    last_event: Option<EventRecord>,
}

impl RunCapture {
    /// Copy the observable state of `engine`.
    pub fn from_engine(engine: &SimulationEngine) -> Self {
        Self {
            snapshot: engine.snapshot(),
            history: engine.history().clone(),
            verification: engine.verification_checks(),
            last_event: engine.last_event(),
        }
    }

    /// Run the capture was taken from.
    pub const fn run_id(&self) -> RunId {
        self.snapshot.run_id
    }

    /// Events the run had processed when captured.
    pub const fn events_processed(&self) -> u64 {
        self.snapshot.events_processed
    }
}

impl ObservedState {
    /// Apply a capture unless it is older than what is already shown.
    ///
    /// Returns whether the capture was applied.
    pub fn apply_capture(&mut self, capture: RunCapture) -> bool {
        let shown = self
            .engine
            .as_ref()
            .map(|snap| (snap.run_id == capture.run_id(), snap.events_processed));
        match shown {
            Some((true, processed)) if processed > capture.events_processed() => return false,
            Some((true, _)) => {}
            _ => self.recent_events.clear(),
        }

        let RunCapture {
            snapshot,
            history,
            verification,
            last_event,
        } = capture;
        if let Some(event) = last_event
            && self.recent_events.back() != Some(&event)
        {
            if self.recent_events.len() >= RECENT_EVENTS_CAPACITY {
                self.recent_events.pop_front();
            }
            self.recent_events.push_back(event);
        }
        self.engine = Some(snapshot);
        self.history = history;
        self.verification = verification;
        true
    }
}

fn catch_up(local: &mut HistorySeries, source: &HistorySeries) {
    let from = local.len();
    if from > source.len() {
        *local = source.clone();
        return;
    }
    local
        .time
        .extend_from_slice(source.time.get(from..).unwrap_or_default());
    local
        .queue_length
        .extend_from_slice(source.queue_length.get(from..).unwrap_or_default());
    local
        .utilization
        .extend_from_slice(source.utilization.get(from..).unwrap_or_default());
    local.cumulative_utilization.extend_from_slice(
        source
            .cumulative_utilization
            .get(from..)
            .unwrap_or_default(),
    );
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast sender for step summaries.
    pub tx: broadcast::Sender<StepBroadcast>,
    /// The observed run (updated each step).
    pub observed: Arc<RwLock<ObservedState>>,
    /// Shared operator control state (present when a run loop is attached).
    pub operator_state: Option<Arc<OperatorState>>,
}

impl AppState {
    /// Create application state with nothing observed yet.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            observed: Arc::new(RwLock::new(ObservedState::default())),
            operator_state: None,
        }
    }

    /// Create application state with operator control state attached.
    pub fn with_operator(operator: Arc<OperatorState>) -> Self {
        Self {
            operator_state: Some(operator),
            ..Self::new()
        }
    }

    /// Subscribe to the step broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<StepBroadcast> {
        self.tx.subscribe()
    }

    /// Publish a step summary to all connected clients.
    ///
    /// Returns the number of receivers reached; 0 when nobody listens.
    pub fn broadcast(&self, summary: &StepBroadcast) -> usize {
        self.tx.send(summary.clone()).unwrap_or(0)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

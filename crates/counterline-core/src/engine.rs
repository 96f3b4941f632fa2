//! The discrete-event engine.
//!
//! [`SimulationEngine::step`] performs exactly one event: extract the
//! earliest entry from the future-event list, move the clock to its
//! timestamp, dispatch on its [`EventKind`], then record one metrics
//! sample. Handlers may schedule follow-up events, including zero-delay
//! ones at the current time, which the scheduler's FIFO tie-break keeps
//! in causal order.
//!
//! # Event handling
//!
//! | Kind | Effect |
//! |------|--------|
//! | `Arrival` | record arrival; take the lowest idle slot and schedule `ServiceStart` now, or join the waiting line |
//! | `ServiceStart` | record start; add the wait; schedule `ServiceEnd` after one service duration |
//! | `ServiceEnd` | count served; free the slot and credit its busy time; hand the slot to the head of the line with a `ServiceStart` now |
//!
//! An empty future-event list is the end of the run, not an error.

use std::collections::BTreeMap;

use counterline_scheduler::{FutureEventList, HeapScheduler, SchedulerError, UnsortedScheduler};
use counterline_types::{
    EngineSnapshot, EventKind, EventRecord, HistorySeries, RunId, RunParameters, SchedulerKind,
    ServiceMode, SubjectId, SubjectRecord, VerificationCheck,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};
use tracing::{debug, error, info};

use crate::clock::SimulationClock;
use crate::config::{ConfigError, QueueConfig};
use crate::conservation::{SubjectCounts, conservation_checks};
use crate::error::SimulationError;
use crate::metrics::MetricsRecorder;
use crate::servers::ServerPool;
use crate::waiting_line::WaitingLine;

/// The engine's future-event list: event time to event record.
pub type EventScheduler = Box<dyn FutureEventList<f64, EventRecord> + Send + Sync>;

/// Result of one successful [`SimulationEngine::try_step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// One event was dispatched.
    Processed(EventRecord),
    /// The future-event list is empty; nothing was changed.
    Drained,
}

/// Source of service durations.
#[derive(Debug, Clone)]
enum ServiceDuration {
    Fixed(f64),
    Exponential(Exp<f64>),
}

impl ServiceDuration {
    fn for_config(config: &QueueConfig) -> Result<Self, SimulationError> {
        match config.service_mode {
            ServiceMode::Fixed => Ok(Self::Fixed(config.service_time)),
            ServiceMode::Exponential => Exp::new(config.service_time.recip())
                .map(Self::Exponential)
                .map_err(|e| SimulationError::Distribution {
                    reason: format!("service time distribution: {e}"),
                }),
        }
    }

    fn sample(&self, rng: &mut StdRng) -> f64 {
        match self {
            Self::Fixed(duration) => *duration,
            Self::Exponential(exp) => exp.sample(rng),
        }
    }
}

/// A single simulation run.
///
/// Owns every piece of run state: scheduler, clock, server pool, waiting
/// line, customer table, and metrics. Nothing is shared between engines.
pub struct SimulationEngine {
    run_id: RunId,
    config: QueueConfig,
    seed: u64,
    rng: StdRng,
    service: ServiceDuration,
    scheduler: EventScheduler,
    clock: SimulationClock,
    servers: ServerPool,
    waiting_line: WaitingLine,
    subjects: BTreeMap<SubjectId, SubjectRecord>,
    metrics: MetricsRecorder,
    events_processed: u64,
    last_event: Option<EventRecord>,
    drain_logged: bool,
}

impl core::fmt::Debug for SimulationEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimulationEngine")
            .field("run_id", &self.run_id)
            .field("seed", &self.seed)
            .field("now", &self.clock.now())
            .field("pending_events", &self.scheduler.len())
            .field("queue_length", &self.waiting_line.len())
            .field("servers", &self.servers.slots())
            .field("events_processed", &self.events_processed)
            .finish_non_exhaustive()
    }
}

impl SimulationEngine {
    /// Build an engine and schedule every arrival.
    ///
    /// Interarrival gaps are exponential with rate `arrival_rate`;
    /// arrival times are their running sums. The random source is seeded
    /// from `config.seed`, or from a freshly drawn seed reported by
    /// [`seed`](Self::seed).
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Config`] if the parameters fail
    /// validation, or [`SimulationError::Distribution`] if a sampling
    /// distribution cannot be built.
    pub fn new(config: &QueueConfig) -> Result<Self, SimulationError> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);

        let interarrival = Exp::new(config.arrival_rate).map_err(|e| SimulationError::Distribution {
            reason: format!("interarrival distribution: {e}"),
        })?;

        let mut time = 0.0_f64;
        let arrivals = (0..config.customers)
            .map(|index| {
                time += interarrival.sample(&mut rng);
                EventRecord::new(time, EventKind::Arrival, SubjectId(index))
            })
            .collect();

        Self::build(config.clone(), seed, rng, arrivals)
    }

    /// Build an engine from an explicit arrival schedule.
    ///
    /// Subject ids follow the order of `times`, which need not be sorted.
    /// `config.customers` is replaced by the number of times given and
    /// `config.arrival_rate` is kept only for reporting.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Config`] if `times` is empty, holds a
    /// negative or non-finite value, or the remaining parameters fail
    /// validation.
    pub fn from_arrival_times(config: &QueueConfig, times: &[f64]) -> Result<Self, SimulationError> {
        let mut config = config.clone();
        config.customers = u64::try_from(times.len()).unwrap_or(u64::MAX);
        config.validate()?;

        if let Some(bad) = times.iter().find(|t| !(t.is_finite() && **t >= 0.0)) {
            return Err(ConfigError::InvalidConfiguration {
                reason: format!("arrival times must be finite and non-negative, got {bad}"),
            }
            .into());
        }

        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let rng = StdRng::seed_from_u64(seed);

        let arrivals = times
            .iter()
            .zip(0_u64..)
            .map(|(time, index)| EventRecord::new(*time, EventKind::Arrival, SubjectId(index)))
            .collect();

        Self::build(config, seed, rng, arrivals)
    }

    fn build(
        config: QueueConfig,
        seed: u64,
        rng: StdRng,
        arrivals: Vec<EventRecord>,
    ) -> Result<Self, SimulationError> {
        let service = ServiceDuration::for_config(&config)?;
        let server_count = usize::try_from(config.servers).map_err(|e| {
            SimulationError::from(ConfigError::InvalidConfiguration {
                reason: format!("servers does not fit this platform: {e}"),
            })
        })?;

        let keyed = arrivals.into_iter().map(|event| (event.time, event));
        let scheduler: EventScheduler = match config.scheduler {
            SchedulerKind::Heap => Box::new(HeapScheduler::from_entries(keyed)),
            SchedulerKind::Unsorted => Box::new(keyed.collect::<UnsortedScheduler<_, _>>()),
        };

        let engine = Self {
            run_id: RunId::new(),
            seed,
            rng,
            service,
            scheduler,
            clock: SimulationClock::new(),
            servers: ServerPool::new(server_count),
            waiting_line: WaitingLine::new(),
            subjects: BTreeMap::new(),
            metrics: MetricsRecorder::new(server_count),
            events_processed: 0,
            last_event: None,
            drain_logged: false,
            config,
        };

        info!(
            run_id = %engine.run_id,
            seed = engine.seed,
            servers = engine.config.servers,
            customers = engine.config.customers,
            arrival_rate = engine.config.arrival_rate,
            service_time = engine.config.service_time,
            service_mode = ?engine.config.service_mode,
            scheduler = ?engine.config.scheduler,
            "Simulation engine initialized"
        );

        Ok(engine)
    }

    // -----------------------------------------------------------------------
    // Stepping
    // -----------------------------------------------------------------------

    /// Process one event. Returns `false` once the event list is empty,
    /// and keeps returning `false` without touching any state.
    ///
    /// # Panics
    ///
    /// Panics if engine state is found to be inconsistent. Use
    /// [`try_step`](Self::try_step) to receive that as an error instead.
    pub fn step(&mut self) -> bool {
        match self.try_step() {
            Ok(StepOutcome::Processed(_)) => true,
            Ok(StepOutcome::Drained) => false,
            Err(err) => halt(&err),
        }
    }

    /// Process one event, reporting inconsistencies as errors.
    ///
    /// After an error the engine is in an undefined state and should be
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InconsistentState`] if a handler finds
    /// the run's bookkeeping contradicting itself.
    pub fn try_step(&mut self) -> Result<StepOutcome, SimulationError> {
        let (time, event) = match self.scheduler.extract_min() {
            Ok(entry) => entry,
            Err(SchedulerError::EmptyQueue) => {
                self.log_drain_once();
                return Ok(StepOutcome::Drained);
            }
        };

        self.clock.advance_to(time)?;
        let now = self.clock.now();

        match event.kind {
            EventKind::Arrival => self.on_arrival(now, event.subject)?,
            EventKind::ServiceStart => self.on_service_start(now, event.subject)?,
            EventKind::ServiceEnd => self.on_service_end(now, event.subject)?,
        }

        self.metrics.record_sample(
            now,
            self.waiting_line.len(),
            self.servers.busy_count(),
        );
        self.events_processed = self.events_processed.saturating_add(1);
        self.last_event = Some(event);

        debug!(
            time = now,
            kind = %event.kind,
            subject = %event.subject,
            queue_length = self.waiting_line.len(),
            busy_servers = self.servers.busy_count(),
            pending = self.scheduler.len(),
            "Event dispatched"
        );

        Ok(StepOutcome::Processed(event))
    }

    /// Step until the event list drains. Returns the number of events
    /// processed by this call.
    ///
    /// # Errors
    ///
    /// Returns the first [`SimulationError`] raised by a step.
    pub fn run_to_completion(&mut self) -> Result<u64, SimulationError> {
        let mut processed: u64 = 0;
        while let StepOutcome::Processed(_) = self.try_step()? {
            processed = processed.saturating_add(1);
        }
        Ok(processed)
    }

    // -----------------------------------------------------------------------
    // Handlers
    // -----------------------------------------------------------------------

    fn on_arrival(&mut self, now: f64, subject: SubjectId) -> Result<(), SimulationError> {
        if self
            .subjects
            .insert(subject, SubjectRecord::arrived_at(now))
            .is_some()
        {
            return Err(SimulationError::inconsistent(format!(
                "subject {subject} arrived twice"
            )));
        }

        if let Some(slot) = self.servers.first_idle() {
            self.servers.occupy(slot, subject)?;
            self.schedule(now, EventKind::ServiceStart, subject);
        } else {
            self.waiting_line.join(subject);
        }
        Ok(())
    }

    fn on_service_start(&mut self, now: f64, subject: SubjectId) -> Result<(), SimulationError> {
        let record = self.subjects.get_mut(&subject).ok_or_else(|| {
            SimulationError::inconsistent(format!("service start for unknown subject {subject}"))
        })?;
        record.service_start_time = Some(now);
        let wait = now - record.arrival_time;
        self.metrics.record_wait(wait);

        let duration = self.service.sample(&mut self.rng);
        self.schedule(now + duration, EventKind::ServiceEnd, subject);
        Ok(())
    }

    fn on_service_end(&mut self, now: f64, subject: SubjectId) -> Result<(), SimulationError> {
        let started = self
            .subjects
            .get(&subject)
            .and_then(|r| r.service_start_time)
            .ok_or_else(|| {
                SimulationError::inconsistent(format!(
                    "service end for subject {subject} that never started service"
                ))
            })?;
        let slot = self.servers.release(subject).ok_or_else(|| {
            SimulationError::inconsistent(format!(
                "service end for subject {subject} that holds no server slot"
            ))
        })?;
        self.metrics.record_service_end(slot, now - started, now)?;

        if let Some(next) = self.waiting_line.take_head() {
            self.servers.occupy(slot, next)?;
            self.schedule(now, EventKind::ServiceStart, next);
        }
        Ok(())
    }

    fn schedule(&mut self, time: f64, kind: EventKind, subject: SubjectId) {
        self.scheduler
            .insert(time, EventRecord::new(time, kind, subject));
    }

    fn log_drain_once(&mut self) {
        if self.drain_logged {
            return;
        }
        self.drain_logged = true;
        info!(
            run_id = %self.run_id,
            end_time = self.clock.now(),
            events_processed = self.events_processed,
            served = self.metrics.served_count(),
            average_wait = self.metrics.average_wait(),
            cumulative_utilization = self.metrics.latest_cumulative_utilization(),
            "Future event list drained"
        );
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Identifier of this run.
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Seed the random source was built from.
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// The configuration this run was built from.
    pub const fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Parameters this run was built from.
    pub const fn params(&self) -> RunParameters {
        self.config.params()
    }

    /// Current simulation time.
    pub const fn current_time(&self) -> f64 {
        self.clock.now()
    }

    /// Number of subjects waiting for a server.
    pub fn queue_length(&self) -> usize {
        self.waiting_line.len()
    }

    /// The waiting line, head first.
    pub const fn waiting_line(&self) -> &WaitingLine {
        &self.waiting_line
    }

    /// The server pool.
    pub const fn servers(&self) -> &ServerPool {
        &self.servers
    }

    /// The metrics recorder.
    pub const fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    /// The four history series.
    pub const fn history(&self) -> &HistorySeries {
        self.metrics.history()
    }

    /// Timing record of a subject that has arrived.
    pub fn subject(&self, id: SubjectId) -> Option<&SubjectRecord> {
        self.subjects.get(&id)
    }

    /// Events still scheduled.
    pub fn pending_events(&self) -> usize {
        self.scheduler.len()
    }

    /// The next event `step` would dispatch.
    pub fn next_event(&self) -> Option<&EventRecord> {
        self.scheduler.peek_min().ok().map(|(_, event)| event)
    }

    /// Events dispatched so far.
    pub const fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// The most recently dispatched event.
    pub const fn last_event(&self) -> Option<EventRecord> {
        self.last_event
    }

    /// Whether the event list is empty.
    pub fn is_finished(&self) -> bool {
        self.scheduler.is_empty()
    }

    /// Where every subject currently is.
    pub fn subject_counts(&self) -> SubjectCounts {
        SubjectCounts {
            scheduled: self.config.customers,
            arrived: to_u64(self.subjects.len()),
            waiting: to_u64(self.waiting_line.len()),
            in_service: to_u64(self.servers.busy_count()),
            served: self.metrics.served_count(),
        }
    }

    /// Read-only projection for observers.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            run_id: self.run_id,
            seed: self.seed,
            params: self.params(),
            current_time: self.clock.now(),
            queue_length: to_u64(self.waiting_line.len()),
            servers: self.servers.slots().to_vec(),
            arrived_count: to_u64(self.subjects.len()),
            served_count: self.metrics.served_count(),
            total_wait_time: self.metrics.total_wait_time(),
            average_wait: self.metrics.average_wait(),
            instant_utilization: self.servers.utilization(),
            cumulative_utilization: self.metrics.latest_cumulative_utilization(),
            events_processed: self.events_processed,
            pending_events: to_u64(self.scheduler.len()),
            last_event: self.last_event,
            finished: self.is_finished(),
        }
    }

    // -----------------------------------------------------------------------
    // Verification
    // -----------------------------------------------------------------------

    /// Structured diagnostic checks. Never fails.
    pub fn verification_checks(&self) -> Vec<VerificationCheck> {
        let mut checks = self.metrics.checks();
        checks.extend(conservation_checks(
            &self.subject_counts(),
            self.is_finished(),
        ));
        checks
    }

    /// Diagnostic checks rendered as pass/fail lines, e.g.
    /// `"Final Instant Utilization: 0.500 ✓"`. Never fails.
    pub fn verify(&self) -> Vec<String> {
        self.verification_checks()
            .iter()
            .map(ToString::to_string)
            .collect()
    }
}

fn to_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

/// Stop the process on an inconsistent engine state.
#[allow(clippy::panic)]
fn halt(err: &SimulationError) -> ! {
    error!(error = %err, "Simulation halted on inconsistent state");
    panic!("simulation halted: {err}");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fixed(servers: u32, service_time: f64) -> QueueConfig {
        QueueConfig {
            servers,
            service_time,
            seed: Some(1),
            ..QueueConfig::default()
        }
    }

    #[test]
    fn new_schedules_one_arrival_per_customer() {
        let config = QueueConfig {
            customers: 12,
            seed: Some(3),
            ..QueueConfig::default()
        };
        let engine = SimulationEngine::new(&config).unwrap();
        assert_eq!(engine.pending_events(), 12);
        assert_eq!(engine.events_processed(), 0);
        assert!(engine.history().is_empty());
        assert_eq!(engine.next_event().map(|e| e.kind), Some(EventKind::Arrival));
        assert_eq!(engine.next_event().map(|e| e.subject), Some(SubjectId(0)));
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = QueueConfig {
            servers: 0,
            ..QueueConfig::default()
        };
        assert!(matches!(
            SimulationEngine::new(&config),
            Err(SimulationError::Config { .. })
        ));
    }

    #[test]
    fn same_seed_same_arrivals() {
        let config = QueueConfig {
            customers: 20,
            seed: Some(77),
            ..QueueConfig::default()
        };
        let mut a = SimulationEngine::new(&config).unwrap();
        let mut b = SimulationEngine::new(&config).unwrap();
        a.run_to_completion().unwrap();
        b.run_to_completion().unwrap();
        assert_eq!(a.history(), b.history());
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn unseeded_runs_report_their_seed() {
        let config = QueueConfig {
            seed: None,
            customers: 5,
            ..QueueConfig::default()
        };
        let mut first = SimulationEngine::new(&config).unwrap();
        let replay_config = QueueConfig {
            seed: Some(first.seed()),
            ..config
        };
        let mut replay = SimulationEngine::new(&replay_config).unwrap();
        first.run_to_completion().unwrap();
        replay.run_to_completion().unwrap();
        assert_eq!(first.history(), replay.history());
    }

    #[test]
    fn oversized_runs_are_rejected_before_allocation() {
        let huge_customers = QueueConfig {
            customers: u64::MAX / 2,
            ..QueueConfig::default()
        };
        assert!(matches!(
            SimulationEngine::new(&huge_customers),
            Err(SimulationError::Config { .. })
        ));

        let huge_servers = QueueConfig {
            servers: u32::MAX,
            ..QueueConfig::default()
        };
        assert!(matches!(
            SimulationEngine::new(&huge_servers),
            Err(SimulationError::Config { .. })
        ));
    }

    #[test]
    fn from_arrival_times_rejects_bad_input() {
        let config = fixed(1, 1.0);
        assert!(SimulationEngine::from_arrival_times(&config, &[]).is_err());
        assert!(SimulationEngine::from_arrival_times(&config, &[1.0, -2.0]).is_err());
        assert!(SimulationEngine::from_arrival_times(&config, &[f64::NAN]).is_err());
    }

    #[test]
    fn arrival_with_idle_server_schedules_zero_delay_start() {
        let mut engine = SimulationEngine::from_arrival_times(&fixed(1, 2.0), &[0.5]).unwrap();
        assert!(engine.step());
        let next = engine.next_event().copied().unwrap();
        assert_eq!(next.kind, EventKind::ServiceStart);
        assert!((next.time - 0.5).abs() < f64::EPSILON);
        assert_eq!(engine.servers().slots(), &[Some(SubjectId(0))]);
    }

    #[test]
    fn drained_engine_stays_drained() {
        let mut engine = SimulationEngine::from_arrival_times(&fixed(1, 1.0), &[0.0]).unwrap();
        let processed = engine.run_to_completion().unwrap();
        assert_eq!(processed, 3);
        let before = engine.snapshot();
        assert!(!engine.step());
        assert!(!engine.step());
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn exponential_service_mode_varies_durations() {
        let config = QueueConfig {
            servers: 4,
            service_mode: ServiceMode::Exponential,
            ..fixed(4, 2.0)
        };
        let times: Vec<f64> = (0..4).map(f64::from).collect();
        let mut engine = SimulationEngine::from_arrival_times(&config, &times).unwrap();
        engine.run_to_completion().unwrap();
        let busy = engine.metrics().per_server_busy_time();
        assert!(busy.iter().any(|b| (b - 2.0).abs() > 1e-9));
        assert_eq!(engine.metrics().served_count(), 4);
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut engine = SimulationEngine::from_arrival_times(&fixed(1, 5.0), &[1.0, 2.0]).unwrap();
        for _ in 0..3 {
            assert!(engine.step());
        }
        let snap = engine.snapshot();
        assert_eq!(snap.queue_length, 1);
        assert_eq!(snap.arrived_count, 2);
        assert_eq!(snap.served_count, 0);
        assert_eq!(snap.events_processed, 3);
        assert!(!snap.finished);
        assert!((snap.instant_utilization - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn debug_output_is_summarized() {
        let engine = SimulationEngine::from_arrival_times(&fixed(1, 1.0), &[0.0]).unwrap();
        let text = format!("{engine:?}");
        assert!(text.contains("SimulationEngine"));
        assert!(text.contains("pending_events: 1"));
    }
}

//! Running statistics and per-event history for one run.
//!
//! Accumulators only grow. After every dispatched event the engine calls
//! [`MetricsRecorder::record_sample`], which appends exactly one value to
//! each of the four history series, keeping them index-aligned.
//!
//! # Cumulative utilization
//!
//! ```text
//! total_busy_time / (server_count * max(now, 1))
//! ```
//!
//! The `max(now, 1)` floor keeps the ratio finite at `now == 0`. It also
//! understates utilization for runs whose events all happen before time
//! 1, so treat early samples as approximate. Busy time is only credited
//! when a service ends, so in-progress service is not counted either.

use counterline_types::{HistorySeries, VerificationCheck};

use crate::error::SimulationError;

/// Accumulators and history series for one run.
///
/// The queue maximum and the monotonicity flag are kept as running values
/// so [`checks`](Self::checks) does not rescan the history.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRecorder {
    total_wait_time: f64,
    served_count: u64,
    per_server_busy_time: Vec<f64>,
    last_event_time: f64,
    history: HistorySeries,
    max_queue_length: u64,
    time_decreased: bool,
}

impl MetricsRecorder {
    /// A recorder for a pool of `server_count` slots.
    pub fn new(server_count: usize) -> Self {
        Self {
            total_wait_time: 0.0,
            served_count: 0,
            per_server_busy_time: vec![0.0; server_count],
            last_event_time: 0.0,
            history: HistorySeries::default(),
            max_queue_length: 0,
            time_decreased: false,
        }
    }

    /// Add one subject's wait (recorded when its service starts).
    pub fn record_wait(&mut self, wait: f64) {
        self.total_wait_time += wait;
    }

    /// Count a completed service ending at `now` on `slot` after `busy`
    /// time units.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InconsistentState`] if `slot` is not a
    /// slot of this pool.
    pub fn record_service_end(
        &mut self,
        slot: usize,
        busy: f64,
        now: f64,
    ) -> Result<(), SimulationError> {
        let total = self.per_server_busy_time.get_mut(slot).ok_or_else(|| {
            SimulationError::inconsistent(format!("no busy-time accumulator for slot {slot}"))
        })?;
        *total += busy;
        self.served_count = self.served_count.saturating_add(1);
        self.last_event_time = now;
        Ok(())
    }

    /// Append one sample to every history series.
    pub fn record_sample(&mut self, now: f64, queue_length: usize, busy_slots: usize) {
        let server_count = self.per_server_busy_time.len();

        #[allow(clippy::cast_precision_loss)]
        let instant = if server_count == 0 {
            0.0
        } else {
            busy_slots as f64 / server_count as f64
        };

        #[allow(clippy::cast_precision_loss)]
        let possible = server_count as f64 * now.max(1.0);
        let cumulative = if possible > 0.0 {
            self.total_busy_time() / possible
        } else {
            0.0
        };

        if self.history.time.last().is_some_and(|prev| now < *prev) {
            self.time_decreased = true;
        }
        let queue_length = u64::try_from(queue_length).unwrap_or(u64::MAX);
        self.max_queue_length = self.max_queue_length.max(queue_length);

        self.history.time.push(now);
        self.history.queue_length.push(queue_length);
        self.history.utilization.push(instant);
        self.history.cumulative_utilization.push(cumulative);
    }

    /// Sum of waits recorded so far.
    pub const fn total_wait_time(&self) -> f64 {
        self.total_wait_time
    }

    /// Subjects whose service has ended.
    pub const fn served_count(&self) -> u64 {
        self.served_count
    }

    /// Busy time credited to each slot.
    pub fn per_server_busy_time(&self) -> &[f64] {
        &self.per_server_busy_time
    }

    /// Busy time summed over all slots.
    pub fn total_busy_time(&self) -> f64 {
        self.per_server_busy_time.iter().sum()
    }

    /// Time of the most recent service end.
    pub const fn last_event_time(&self) -> f64 {
        self.last_event_time
    }

    /// The history series.
    pub const fn history(&self) -> &HistorySeries {
        &self.history
    }

    /// `total_wait_time / max(served_count, 1)`.
    ///
    /// Waits are added at service start but subjects are counted at
    /// service end, so mid-run this slightly overstates the true mean.
    pub fn average_wait(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let served = self.served_count.max(1) as f64;
        self.total_wait_time / served
    }

    /// Latest instantaneous utilization sample, or 0 before any event.
    pub fn latest_utilization(&self) -> f64 {
        self.history.utilization.last().copied().unwrap_or(0.0)
    }

    /// Latest cumulative utilization sample, or 0 before any event.
    pub fn latest_cumulative_utilization(&self) -> f64 {
        self.history
            .cumulative_utilization
            .last()
            .copied()
            .unwrap_or(0.0)
    }

    /// Longest waiting line seen so far.
    pub const fn max_queue_length(&self) -> u64 {
        self.max_queue_length
    }

    /// Whether `time_history` never decreases.
    pub const fn time_is_monotone(&self) -> bool {
        !self.time_decreased
    }

    /// Diagnostic checks over the recorded metrics. Never fails.
    ///
    /// Checks, in order: final instantaneous utilization in `[0, 1]`,
    /// final cumulative utilization in `[0, 1]`, maximum queue length,
    /// time monotonicity, then each slot's busy time over the last
    /// service-end time in `[0, 1]`.
    pub fn checks(&self) -> Vec<VerificationCheck> {
        let mut checks = Vec::with_capacity(self.per_server_busy_time.len().saturating_add(4));

        let instant = self.latest_utilization();
        checks.push(VerificationCheck::new(
            "Final Instant Utilization",
            format!("{instant:.3}"),
            in_unit_range(instant),
            "OUT OF RANGE",
        ));

        let cumulative = self.latest_cumulative_utilization();
        checks.push(VerificationCheck::new(
            "Final Cumulative Utilization",
            format!("{cumulative:.3}"),
            in_unit_range(cumulative),
            "OUT OF RANGE",
        ));

        // Lengths are unsigned, so this can only pass.
        checks.push(VerificationCheck::new(
            "Maximum Queue Length",
            self.max_queue_length().to_string(),
            true,
            "NEGATIVE QUEUE",
        ));

        checks.push(VerificationCheck::new(
            "Time Monotonically Increasing",
            "",
            self.time_is_monotone(),
            "TIME DECREASED",
        ));

        let end = self.last_event_time;
        for (slot, busy) in self.per_server_busy_time.iter().enumerate() {
            let utilization = if end > 0.0 { busy / end } else { 0.0 };
            checks.push(VerificationCheck::new(
                format!("Server {slot} utilization"),
                format!("{utilization:.3}"),
                in_unit_range(utilization),
                "",
            ));
        }

        checks
    }
}

fn in_unit_range(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

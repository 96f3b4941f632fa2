//! Core record and projection structs.
//!
//! [`EventRecord`] and [`SubjectRecord`] are the engine's working data.
//! The remaining structs are read-only projections handed to the observer
//! and dashboard; they carry no behavior.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{EventKind, SchedulerKind, ServiceMode};
use crate::ids::{RunId, SubjectId};

/// A scheduled future occurrence. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventRecord {
    /// Simulation time at which the event fires.
    pub time: f64,
    /// What happens.
    pub kind: EventKind,
    /// The subject the event concerns.
    pub subject: SubjectId,
}

impl EventRecord {
    /// Create a new event record.
    pub const fn new(time: f64, kind: EventKind, subject: SubjectId) -> Self {
        Self {
            time,
            kind,
            subject,
        }
    }
}

impl core::fmt::Display for EventRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {} @ {:.2}", self.kind, self.subject, self.time)
    }
}

/// Per-subject timing record kept in the engine's customer table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SubjectRecord {
    /// Time the subject's Arrival event fired.
    pub arrival_time: f64,
    /// Time the subject's `ServiceStart` event fired, once it has.
    pub service_start_time: Option<f64>,
}

impl SubjectRecord {
    /// Create a record for a subject that has just arrived.
    pub const fn arrived_at(arrival_time: f64) -> Self {
        Self {
            arrival_time,
            service_start_time: None,
        }
    }
}

/// The queue parameters a run was started with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RunParameters {
    /// Number of server slots.
    pub servers: u32,
    /// Mean arrivals per unit time.
    pub arrival_rate: f64,
    /// Number of subjects scheduled at initialization.
    pub customers: u64,
    /// Fixed service duration, or the mean when exponential.
    pub service_time: f64,
    /// How service durations are produced.
    pub service_mode: ServiceMode,
    /// Future-event-list backend.
    pub scheduler: SchedulerKind,
}

/// Point-in-time view of the engine for the observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EngineSnapshot {
    /// Identifier of the run this snapshot belongs to.
    pub run_id: RunId,
    /// Seed the run's random source was built from.
    pub seed: u64,
    /// Parameters the run was started with.
    pub params: RunParameters,
    /// Current simulation time.
    pub current_time: f64,
    /// Subjects waiting for a server.
    pub queue_length: u64,
    /// Occupant of each server slot, in slot order.
    pub servers: Vec<Option<SubjectId>>,
    /// Subjects that have arrived so far.
    pub arrived_count: u64,
    /// Subjects that have completed service.
    pub served_count: u64,
    /// Sum of all waits recorded at service start.
    pub total_wait_time: f64,
    /// `total_wait_time / max(served_count, 1)`.
    pub average_wait: f64,
    /// Fraction of slots busy right now.
    pub instant_utilization: f64,
    /// Most recent cumulative utilization sample.
    pub cumulative_utilization: f64,
    /// Number of events dispatched so far.
    pub events_processed: u64,
    /// Events still in the future-event list.
    pub pending_events: u64,
    /// The most recently dispatched event.
    pub last_event: Option<EventRecord>,
    /// Whether the future-event list has drained.
    pub finished: bool,
}

/// The four per-event history series, index-aligned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HistorySeries {
    /// Simulation time after each event.
    pub time: Vec<f64>,
    /// Waiting-line length after each event.
    pub queue_length: Vec<u64>,
    /// Instantaneous utilization after each event.
    pub utilization: Vec<f64>,
    /// Cumulative utilization after each event.
    pub cumulative_utilization: Vec<f64>,
}

impl HistorySeries {
    /// Number of samples recorded.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Whether no samples have been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// One diagnostic check produced by the verification routine.
///
/// Rendered through [`Display`](core::fmt::Display) as
/// `"{label}: {value} ✓"` on success or `"{label}: {value} ✗ {note}"`
/// on failure. An empty `value` or `failure_note` is omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VerificationCheck {
    /// What was checked.
    pub label: String,
    /// The formatted observed value.
    pub value: String,
    /// Whether the check passed.
    pub passed: bool,
    /// Extra text appended after the failure mark.
    pub failure_note: String,
}

impl VerificationCheck {
    /// Build a check from its parts.
    pub fn new(
        label: impl Into<String>,
        value: impl Into<String>,
        passed: bool,
        failure_note: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            passed,
            failure_note: failure_note.into(),
        }
    }
}

impl core::fmt::Display for VerificationCheck {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:", self.label)?;
        if !self.value.is_empty() {
            write!(f, " {}", self.value)?;
        }
        if self.passed {
            f.write_str(" ✓")
        } else if self.failure_note.is_empty() {
            f.write_str(" ✗")
        } else {
            write!(f, " ✗ {}", self.failure_note)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passing_check_renders_tick() {
        let check = VerificationCheck::new("Final Instant Utilization", "0.500", true, "OUT OF RANGE");
        assert_eq!(check.to_string(), "Final Instant Utilization: 0.500 ✓");
    }

    #[test]
    fn failing_check_renders_note() {
        let check = VerificationCheck::new("Maximum Queue Length", "-1", false, "NEGATIVE QUEUE");
        assert_eq!(check.to_string(), "Maximum Queue Length: -1 ✗ NEGATIVE QUEUE");
    }

    #[test]
    fn empty_value_is_omitted() {
        let check = VerificationCheck::new("Time Monotonically Increasing", "", false, "TIME DECREASED");
        assert_eq!(check.to_string(), "Time Monotonically Increasing: ✗ TIME DECREASED");
    }

    #[test]
    fn failure_without_note() {
        let check = VerificationCheck::new("Server 1 utilization", "1.200", false, "");
        assert_eq!(check.to_string(), "Server 1 utilization: 1.200 ✗");
    }

    #[test]
    fn event_record_display() {
        let event = EventRecord::new(2.5, EventKind::Arrival, SubjectId(3));
        assert_eq!(event.to_string(), "arrival #3 @ 2.50");
    }

    #[test]
    fn history_len_tracks_time_series() {
        let mut history = HistorySeries::default();
        assert!(history.is_empty());
        history.time.push(1.0);
        assert_eq!(history.len(), 1);
    }
}

//! Enumeration types for the Counterline simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The kind of a scheduled event.
///
/// The set is closed: the engine dispatches on it with an exhaustive
/// `match`, so adding a kind forces every handler site to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A subject enters the system.
    Arrival,
    /// A subject is assigned a server slot and begins service.
    ServiceStart,
    /// A subject finishes service and releases its slot.
    ServiceEnd,
}

impl core::fmt::Display for EventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            Self::Arrival => "arrival",
            Self::ServiceStart => "service_start",
            Self::ServiceEnd => "service_end",
        };
        f.write_str(label)
    }
}

/// How service durations are produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum ServiceMode {
    /// Every service takes exactly the configured service time.
    #[default]
    Fixed,
    /// Service durations are exponential samples whose mean is the
    /// configured service time.
    Exponential,
}

/// Which future-event-list backend the engine runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum SchedulerKind {
    /// Binary min-heap: O(log n) insert and extract.
    #[default]
    Heap,
    /// Unordered list with a cached minimum: O(1) insert, O(n) extract.
    Unsorted,
}

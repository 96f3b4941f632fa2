//! Error type for scheduler operations.

/// Errors returned by a [`FutureEventList`](crate::FutureEventList).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// `peek_min` or `extract_min` was called on an empty scheduler.
    ///
    /// For the simulation engine this is the normal end-of-run signal,
    /// not a failure.
    #[error("priority queue is empty")]
    EmptyQueue,
}

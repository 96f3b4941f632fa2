//! Future-event-list priority queues for the Counterline simulation.
//!
//! The engine pulls events in timestamp order from a [`FutureEventList`].
//! Two backends implement it:
//!
//! - [`HeapScheduler`] -- array-backed binary min-heap, O(log n) insert
//!   and extract, O(n) bulk construction via
//!   [`HeapScheduler::from_entries`].
//! - [`UnsortedScheduler`] -- unordered list with a cached minimum,
//!   O(1) insert and peek, O(n) extract.
//!
//! Both break ties between equal keys by insertion order, so the engine
//! produces identical runs on either backend. [`pq_sort`] sorts any
//! collection by draining it through a queue.

mod entry;
pub mod error;
pub mod heap;
pub mod sort;
pub mod unsorted;

pub use error::SchedulerError;
pub use heap::HeapScheduler;
pub use sort::{pq_sort, pq_sort_with};
pub use unsorted::UnsortedScheduler;

/// A priority queue that yields entries in ascending key order.
///
/// Object safe, so an engine can hold a `Box<dyn FutureEventList<K, V>>`
/// and pick the backend at runtime.
pub trait FutureEventList<K, V> {
    /// Add an entry.
    fn insert(&mut self, key: K, value: V);

    /// Borrow the entry that [`extract_min`](Self::extract_min) would
    /// return, without removing it.
    fn peek_min(&self) -> Result<(&K, &V), SchedulerError>;

    /// Remove and return the entry with the smallest key. Equal keys
    /// leave in insertion order.
    fn extract_min(&mut self) -> Result<(K, V), SchedulerError>;

    /// Number of stored entries.
    fn len(&self) -> usize;

    /// Whether no entries are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

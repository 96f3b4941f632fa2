//! Scheduler entries and their total order.

use core::cmp::Ordering;

/// A stored `(key, value)` pair tagged with its insertion sequence.
#[derive(Debug, Clone)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) seq: u64,
    pub(crate) value: V,
}

impl<K: PartialOrd, V> Entry<K, V> {
    /// Whether `self` must leave the scheduler before `other`.
    ///
    /// Smaller keys go first. Equal or incomparable keys fall back to the
    /// insertion sequence, so simultaneous entries leave in FIFO order.
    pub(crate) fn precedes(&self, other: &Self) -> bool {
        match self.key.partial_cmp(&other.key) {
            Some(Ordering::Less) => true,
            Some(Ordering::Greater) => false,
            Some(Ordering::Equal) | None => self.seq < other.seq,
        }
    }
}

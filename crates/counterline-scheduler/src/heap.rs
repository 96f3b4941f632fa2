//! Array-backed binary min-heap.
//!
//! Entries live in a dense `Vec` interpreted as a complete binary tree:
//! the children of index `i` sit at `2i + 1` and `2i + 2`, its parent at
//! `(i - 1) / 2`. After every public operation each non-root entry is
//! ordered no earlier than its parent (see [`Entry::precedes`]).
//!
//! Sift-up and sift-down are iterative; neither recurses.

use crate::FutureEventList;
use crate::entry::Entry;
use crate::error::SchedulerError;

/// Binary min-heap priority queue keyed by `K`.
///
/// Ties between equal keys are broken by insertion order.
#[derive(Debug, Clone)]
pub struct HeapScheduler<K, V> {
    entries: Vec<Entry<K, V>>,
    next_seq: u64,
}

impl<K, V> Default for HeapScheduler<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
        }
    }
}

impl<K: PartialOrd, V> HeapScheduler<K, V> {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty heap with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            next_seq: 0,
        }
    }

    /// Build a heap from `(key, value)` pairs in O(n).
    ///
    /// Pairs are stored as given, then every non-leaf position is sifted
    /// down from the last parent back to the root. Sequence numbers follow
    /// input order, so the result extracts exactly like n individual
    /// inserts would.
    pub fn from_entries<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut next_seq: u64 = 0;
        let entries: Vec<Entry<K, V>> = pairs
            .into_iter()
            .map(|(key, value)| {
                let seq = next_seq;
                next_seq = next_seq.saturating_add(1);
                Entry { key, seq, value }
            })
            .collect();

        let mut heap = Self { entries, next_seq };
        let first_leaf = heap.entries.len() / 2;
        for idx in (0..first_leaf).rev() {
            heap.sift_down(idx);
        }
        heap
    }

    /// Check the min-heap invariant over every parent/child pair.
    pub fn is_heap(&self) -> bool {
        (1..self.entries.len()).all(|idx| {
            let parent = parent_of(idx);
            !self.precedes_at(idx, parent)
        })
    }

    /// Remove every entry. Sequence numbering continues.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over the stored pairs in heap-array order (not sorted).
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|e| (&e.key, &e.value))
    }

    fn precedes_at(&self, a: usize, b: usize) -> bool {
        match (self.entries.get(a), self.entries.get(b)) {
            (Some(lhs), Some(rhs)) => lhs.precedes(rhs),
            _ => false,
        }
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = parent_of(idx);
            if !self.precedes_at(idx, parent) {
                break;
            }
            self.entries.swap(idx, parent);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.entries.len();
        loop {
            let Some(left) = idx.checked_mul(2).and_then(|i| i.checked_add(1)) else {
                break;
            };
            if left >= len {
                break;
            }
            let right = left.saturating_add(1);
            let smaller = if right < len && self.precedes_at(right, left) {
                right
            } else {
                left
            };
            if !self.precedes_at(smaller, idx) {
                break;
            }
            self.entries.swap(idx, smaller);
            idx = smaller;
        }
    }
}

impl<K: PartialOrd, V> FutureEventList<K, V> for HeapScheduler<K, V> {
    fn insert(&mut self, key: K, value: V) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        self.entries.push(Entry { key, seq, value });
        let last = self.entries.len().saturating_sub(1);
        self.sift_up(last);
    }

    fn peek_min(&self) -> Result<(&K, &V), SchedulerError> {
        self.entries
            .first()
            .map(|e| (&e.key, &e.value))
            .ok_or(SchedulerError::EmptyQueue)
    }

    fn extract_min(&mut self) -> Result<(K, V), SchedulerError> {
        if self.entries.is_empty() {
            return Err(SchedulerError::EmptyQueue);
        }
        // Moves the last leaf into the root slot.
        let root = self.entries.swap_remove(0);
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        Ok((root.key, root.value))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Parent index of a non-root position.
const fn parent_of(idx: usize) -> usize {
    idx.saturating_sub(1) / 2
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn drain<K: PartialOrd, V>(heap: &mut HeapScheduler<K, V>) -> Vec<(K, V)> {
        let mut out = Vec::new();
        while let Ok(pair) = heap.extract_min() {
            out.push(pair);
        }
        out
    }

    #[test]
    fn empty_heap_reports_empty_queue() {
        let mut heap: HeapScheduler<f64, u32> = HeapScheduler::new();
        assert!(heap.is_empty());
        assert_eq!(heap.peek_min().err(), Some(SchedulerError::EmptyQueue));
        assert_eq!(heap.extract_min().err(), Some(SchedulerError::EmptyQueue));
    }

    #[test]
    fn insert_then_extract_single() {
        let mut heap = HeapScheduler::new();
        heap.insert(4.0, "a");
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.peek_min().unwrap(), (&4.0, &"a"));
        assert_eq!(heap.extract_min().unwrap(), (4.0, "a"));
        assert!(heap.is_empty());
    }

    #[test]
    fn peek_does_not_mutate() {
        let mut heap = HeapScheduler::new();
        heap.insert(2.0, 'x');
        heap.insert(1.0, 'y');
        let _ = heap.peek_min();
        let _ = heap.peek_min();
        assert_eq!(heap.len(), 2);
        assert_eq!(heap.peek_min().unwrap(), (&1.0, &'y'));
    }

    #[test]
    fn drains_mixed_keys_in_order() {
        let mut heap = HeapScheduler::new();
        for key in [5, 3, 8, 1, 9, 2] {
            heap.insert(key, ());
            assert!(heap.is_heap());
        }
        let keys: Vec<i32> = drain(&mut heap).into_iter().map(|(k, ())| k).collect();
        assert_eq!(keys, vec![1, 2, 3, 5, 8, 9]);
    }

    #[test]
    fn equal_keys_leave_in_insertion_order() {
        let mut heap = HeapScheduler::new();
        heap.insert(1.0, "first");
        heap.insert(0.5, "early");
        heap.insert(1.0, "second");
        heap.insert(1.0, "third");
        let values: Vec<&str> = drain(&mut heap).into_iter().map(|(_, v)| v).collect();
        assert_eq!(values, vec!["early", "first", "second", "third"]);
    }

    #[test]
    fn from_entries_builds_valid_heap() {
        let heap = HeapScheduler::from_entries([(9, 'a'), (4, 'b'), (7, 'c'), (1, 'd'), (3, 'e')]);
        assert!(heap.is_heap());
        assert_eq!(heap.len(), 5);
        assert_eq!(heap.peek_min().unwrap(), (&1, &'d'));
    }

    #[test]
    fn from_entries_keeps_fifo_for_ties() {
        let mut heap = HeapScheduler::from_entries([(2, 'a'), (2, 'b'), (1, 'c'), (2, 'd')]);
        let values: Vec<char> = drain(&mut heap).into_iter().map(|(_, v)| v).collect();
        assert_eq!(values, vec!['c', 'a', 'b', 'd']);
    }

    #[test]
    fn from_entries_empty_and_single() {
        let empty: HeapScheduler<u8, ()> = HeapScheduler::from_entries(Vec::new());
        assert!(empty.is_empty());
        assert!(empty.is_heap());

        let one = HeapScheduler::from_entries([(3u8, ())]);
        assert_eq!(one.len(), 1);
        assert!(one.is_heap());
    }

    #[test]
    fn inserts_after_bulk_build_continue_sequence() {
        let mut heap = HeapScheduler::from_entries([(1, "bulk")]);
        heap.insert(1, "later");
        let values: Vec<&str> = drain(&mut heap).into_iter().map(|(_, v)| v).collect();
        assert_eq!(values, vec!["bulk", "later"]);
    }

    #[test]
    fn clear_empties_the_heap() {
        let mut heap = HeapScheduler::from_entries([(1, ()), (2, ())]);
        heap.clear();
        assert!(heap.is_empty());
        assert_eq!(heap.iter().count(), 0);
    }
}

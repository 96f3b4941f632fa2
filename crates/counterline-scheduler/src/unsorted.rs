//! Unordered-list priority queue with a cached minimum position.
//!
//! Insert appends and compares against the cached minimum (O(1)).
//! `peek_min` reads the cached position (O(1)). `extract_min` removes that
//! position and rescans the remaining entries (O(n)).

use crate::FutureEventList;
use crate::entry::Entry;
use crate::error::SchedulerError;

/// Priority queue over an unsorted `Vec`.
///
/// Entries keep their insertion order in storage, so the rescan naturally
/// resolves equal keys first-encountered-first, matching
/// [`HeapScheduler`](crate::HeapScheduler).
#[derive(Debug, Clone)]
pub struct UnsortedScheduler<K, V> {
    entries: Vec<Entry<K, V>>,
    min_pos: Option<usize>,
    next_seq: u64,
}

impl<K, V> Default for UnsortedScheduler<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            min_pos: None,
            next_seq: 0,
        }
    }
}

impl<K: PartialOrd, V> UnsortedScheduler<K, V> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    fn rescan(&mut self) {
        let mut best: Option<usize> = None;
        for (idx, entry) in self.entries.iter().enumerate() {
            let better = match best.and_then(|b| self.entries.get(b)) {
                Some(current) => entry.precedes(current),
                None => true,
            };
            if better {
                best = Some(idx);
            }
        }
        self.min_pos = best;
    }
}

impl<K: PartialOrd, V> FromIterator<(K, V)> for UnsortedScheduler<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut queue = Self::new();
        for (key, value) in iter {
            queue.insert(key, value);
        }
        queue
    }
}

impl<K: PartialOrd, V> FutureEventList<K, V> for UnsortedScheduler<K, V> {
    fn insert(&mut self, key: K, value: V) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        let entry = Entry { key, seq, value };

        let becomes_min = match self.min_pos.and_then(|p| self.entries.get(p)) {
            Some(current) => entry.precedes(current),
            None => true,
        };
        self.entries.push(entry);
        if becomes_min {
            self.min_pos = Some(self.entries.len().saturating_sub(1));
        }
    }

    fn peek_min(&self) -> Result<(&K, &V), SchedulerError> {
        self.min_pos
            .and_then(|p| self.entries.get(p))
            .map(|e| (&e.key, &e.value))
            .ok_or(SchedulerError::EmptyQueue)
    }

    fn extract_min(&mut self) -> Result<(K, V), SchedulerError> {
        let pos = self
            .min_pos
            .filter(|p| *p < self.entries.len())
            .ok_or(SchedulerError::EmptyQueue)?;
        let entry = self.entries.remove(pos);
        self.rescan();
        Ok((entry.key, entry.value))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_queue_errors() {
        let mut queue: UnsortedScheduler<f64, ()> = UnsortedScheduler::new();
        assert_eq!(queue.peek_min().err(), Some(SchedulerError::EmptyQueue));
        assert_eq!(queue.extract_min().err(), Some(SchedulerError::EmptyQueue));
    }

    #[test]
    fn cached_minimum_tracks_inserts() {
        let mut queue = UnsortedScheduler::new();
        queue.insert(5, 'a');
        assert_eq!(queue.peek_min().unwrap(), (&5, &'a'));
        queue.insert(2, 'b');
        assert_eq!(queue.peek_min().unwrap(), (&2, &'b'));
        queue.insert(7, 'c');
        assert_eq!(queue.peek_min().unwrap(), (&2, &'b'));
    }

    #[test]
    fn extract_rescans_for_next_minimum() {
        let mut queue: UnsortedScheduler<i32, ()> = [5, 3, 8, 1, 9, 2].into_iter().map(|k| (k, ())).collect();
        let mut keys = Vec::new();
        while let Ok((k, ())) = queue.extract_min() {
            keys.push(k);
        }
        assert_eq!(keys, vec![1, 2, 3, 5, 8, 9]);
        assert!(queue.is_empty());
    }

    #[test]
    fn ties_resolve_first_encountered() {
        let mut queue = UnsortedScheduler::new();
        queue.insert(1.0, "first");
        queue.insert(1.0, "second");
        queue.insert(0.0, "zero");
        queue.insert(1.0, "third");
        let mut values = Vec::new();
        while let Ok((_, v)) = queue.extract_min() {
            values.push(v);
        }
        assert_eq!(values, vec!["zero", "first", "second", "third"]);
    }
}

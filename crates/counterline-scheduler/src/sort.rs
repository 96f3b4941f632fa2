//! Sorting by draining a priority queue.

use crate::FutureEventList;
use crate::heap::HeapScheduler;

/// Return `items` in non-decreasing order using a [`HeapScheduler`].
///
/// Each item is its own key. Equal items keep their input order.
pub fn pq_sort<T: PartialOrd>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    pq_sort_with(HeapScheduler::new(), items)
}

/// Sort `items` through any [`FutureEventList`] backend.
///
/// The queue should start empty; any entries already in it are drained
/// into the output alongside `items`.
pub fn pq_sort_with<T, Q>(mut queue: Q, items: impl IntoIterator<Item = T>) -> Vec<T>
where
    Q: FutureEventList<T, ()>,
{
    for item in items {
        queue.insert(item, ());
    }
    let mut sorted = Vec::with_capacity(queue.len());
    while let Ok((item, ())) = queue.extract_min() {
        sorted.push(item);
    }
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unsorted::UnsortedScheduler;

    #[test]
    fn sorts_integers() {
        assert_eq!(pq_sort([5, 3, 8, 1, 9, 2]), vec![1, 2, 3, 5, 8, 9]);
    }

    #[test]
    fn sorts_with_unsorted_backend() {
        let sorted = pq_sort_with(UnsortedScheduler::new(), ["pear", "apple", "fig"]);
        assert_eq!(sorted, vec!["apple", "fig", "pear"]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let sorted: Vec<u8> = pq_sort(Vec::new());
        assert!(sorted.is_empty());
    }

    #[test]
    fn duplicates_survive() {
        assert_eq!(pq_sort([2, 1, 2, 1]), vec![1, 1, 2, 2]);
    }
}

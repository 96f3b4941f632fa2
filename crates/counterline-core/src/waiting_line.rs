//! FIFO line of subjects waiting for a server.

use std::collections::VecDeque;

use counterline_types::SubjectId;

/// Subjects in arrival order. Joined only when every slot is busy;
/// left only when a slot frees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitingLine {
    line: VecDeque<SubjectId>,
}

impl WaitingLine {
    /// An empty line.
    pub const fn new() -> Self {
        Self {
            line: VecDeque::new(),
        }
    }

    /// Add a subject at the tail.
    pub fn join(&mut self, subject: SubjectId) {
        self.line.push_back(subject);
    }

    /// Remove and return the head.
    pub fn take_head(&mut self) -> Option<SubjectId> {
        self.line.pop_front()
    }

    /// Number of subjects waiting.
    pub fn len(&self) -> usize {
        self.line.len()
    }

    /// Whether nobody is waiting.
    pub fn is_empty(&self) -> bool {
        self.line.is_empty()
    }

    /// Whether `subject` is in the line.
    pub fn contains(&self, subject: SubjectId) -> bool {
        self.line.contains(&subject)
    }

    /// Iterate head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &SubjectId> {
        self.line.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_in_arrival_order() {
        let mut line = WaitingLine::new();
        line.join(SubjectId(3));
        line.join(SubjectId(1));
        line.join(SubjectId(2));
        assert_eq!(line.len(), 3);
        assert_eq!(line.take_head(), Some(SubjectId(3)));
        assert_eq!(line.take_head(), Some(SubjectId(1)));
        assert_eq!(line.take_head(), Some(SubjectId(2)));
        assert_eq!(line.take_head(), None);
        assert!(line.is_empty());
    }

    #[test]
    fn contains_reports_membership() {
        let mut line = WaitingLine::new();
        line.join(SubjectId(4));
        assert!(line.contains(SubjectId(4)));
        assert!(!line.contains(SubjectId(5)));
        assert_eq!(line.iter().count(), 1);
    }
}

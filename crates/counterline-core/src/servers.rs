//! Fixed-size pool of server slots.
//!
//! Each slot is idle (`None`) or holds exactly one subject. A subject
//! occupies at most one slot.

use counterline_types::SubjectId;

use crate::error::SimulationError;

/// Ordered server slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPool {
    slots: Vec<Option<SubjectId>>,
}

impl ServerPool {
    /// A pool of `count` idle slots.
    pub fn new(count: usize) -> Self {
        Self {
            slots: vec![None; count],
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the pool has no slots at all.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot contents in slot order.
    pub fn slots(&self) -> &[Option<SubjectId>] {
        &self.slots
    }

    /// Number of occupied slots.
    pub fn busy_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Lowest-indexed idle slot, if any.
    pub fn first_idle(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    /// Slot currently holding `subject`.
    pub fn position_of(&self, subject: SubjectId) -> Option<usize> {
        self.slots.iter().position(|s| *s == Some(subject))
    }

    /// Fraction of slots occupied, in `[0, 1]`. Zero for an empty pool.
    pub fn utilization(&self) -> f64 {
        if self.slots.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.busy_count() as f64 / self.slots.len() as f64;
        ratio
    }

    /// Put `subject` into slot `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InconsistentState`] if the slot does not
    /// exist, is already occupied, or the subject already holds a slot.
    pub fn occupy(&mut self, index: usize, subject: SubjectId) -> Result<(), SimulationError> {
        if self.position_of(subject).is_some() {
            return Err(SimulationError::inconsistent(format!(
                "subject {subject} already holds a server slot"
            )));
        }
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            SimulationError::inconsistent(format!("server slot {index} does not exist"))
        })?;
        if let Some(current) = slot {
            return Err(SimulationError::inconsistent(format!(
                "server slot {index} is already serving {current}"
            )));
        }
        *slot = Some(subject);
        Ok(())
    }

    /// Free the slot holding `subject` and return its index.
    pub fn release(&mut self, subject: SubjectId) -> Option<usize> {
        let index = self.position_of(subject)?;
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = None;
        }
        Some(index)
    }
}

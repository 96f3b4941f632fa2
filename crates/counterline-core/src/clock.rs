//! Simulation clock.
//!
//! Time is a non-negative `f64` that only moves forward. The engine
//! advances it to each extracted event's timestamp; simultaneous events
//! leave it unchanged.

use crate::error::SimulationError;

/// Current simulation time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulationClock {
    now: f64,
}

impl SimulationClock {
    /// A clock at time zero.
    pub const fn new() -> Self {
        Self { now: 0.0 }
    }

    /// The current time.
    pub const fn now(&self) -> f64 {
        self.now
    }

    /// Move the clock to `time`.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InconsistentState`] if `time` is not
    /// finite or lies before the current time.
    pub fn advance_to(&mut self, time: f64) -> Result<(), SimulationError> {
        if !time.is_finite() {
            return Err(SimulationError::inconsistent(format!(
                "event time {time} is not finite"
            )));
        }
        if time < self.now {
            return Err(SimulationError::inconsistent(format!(
                "clock asked to move backwards from {} to {time}",
                self.now
            )));
        }
        self.now = time;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        assert!(SimulationClock::new().now().abs() < f64::EPSILON);
    }

    #[test]
    fn advances_forward_and_stays_on_ties() {
        let mut clock = SimulationClock::new();
        assert!(clock.advance_to(1.5).is_ok());
        assert!(clock.advance_to(1.5).is_ok());
        assert!((clock.now() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_time_reversal() {
        let mut clock = SimulationClock::new();
        assert!(clock.advance_to(3.0).is_ok());
        let result = clock.advance_to(2.0);
        assert!(matches!(
            result,
            Err(SimulationError::InconsistentState { .. })
        ));
        assert!((clock.now() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_nan() {
        let mut clock = SimulationClock::new();
        assert!(clock.advance_to(f64::NAN).is_err());
    }
}

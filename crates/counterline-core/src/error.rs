//! Error type for engine construction and stepping.

use crate::config::ConfigError;

/// Errors raised while building or stepping a
/// [`SimulationEngine`](crate::engine::SimulationEngine).
///
/// Running out of events is not an error; see
/// [`StepOutcome::Drained`](crate::engine::StepOutcome::Drained).
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// The queue parameters were rejected before construction.
    #[error("config error: {source}")]
    Config {
        /// The underlying validation error.
        #[from]
        source: ConfigError,
    },

    /// Engine state contradicts itself (a subject missing from the
    /// customer table, a slot that should be occupied but is not, time
    /// moving backwards). The run cannot continue.
    #[error("inconsistent simulation state: {reason}")]
    InconsistentState {
        /// What was found to be inconsistent.
        reason: String,
    },

    /// A random distribution could not be built from the parameters.
    #[error("distribution error: {reason}")]
    Distribution {
        /// Why construction failed.
        reason: String,
    },
}

impl SimulationError {
    /// Shorthand for [`SimulationError::InconsistentState`].
    pub fn inconsistent(reason: impl Into<String>) -> Self {
        Self::InconsistentState {
            reason: reason.into(),
        }
    }
}

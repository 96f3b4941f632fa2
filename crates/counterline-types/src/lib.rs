//! Shared type definitions for the Counterline queue simulation.
//!
//! Types defined here are shared by the scheduler, the engine, and the
//! observer API, and flow to `TypeScript` via `ts-rs` for the dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Run and subject identifiers
//! - [`enums`] -- Event kinds and run-mode selectors
//! - [`structs`] -- Event and subject records plus observer projections

pub mod enums;
pub mod ids;
pub mod structs;

pub use enums::{EventKind, SchedulerKind, ServiceMode};
pub use ids::{RunId, SubjectId};
pub use structs::{
    EngineSnapshot, EventRecord, HistorySeries, RunParameters, SubjectRecord, VerificationCheck,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // Files land in `bindings/` relative to the crate root.
        use ts_rs::TS;

        let _ = crate::ids::RunId::export_all();
        let _ = crate::ids::SubjectId::export_all();

        let _ = crate::enums::EventKind::export_all();
        let _ = crate::enums::ServiceMode::export_all();
        let _ = crate::enums::SchedulerKind::export_all();

        let _ = crate::structs::EventRecord::export_all();
        let _ = crate::structs::SubjectRecord::export_all();
        let _ = crate::structs::RunParameters::export_all();
        let _ = crate::structs::EngineSnapshot::export_all();
        let _ = crate::structs::HistorySeries::export_all();
        let _ = crate::structs::VerificationCheck::export_all();
    }
}

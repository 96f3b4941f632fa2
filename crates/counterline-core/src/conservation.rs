//! Subject conservation check.
//!
//! Every subject that has arrived is in exactly one place: waiting, in
//! service, or done. For any engine state:
//!
//! ```text
//! served + in_service + waiting == arrived
//! ```
//!
//! The engine's handlers preserve this by construction. The check exists
//! to catch bookkeeping regressions, and it is reported alongside the
//! metric checks rather than raised.

use counterline_types::VerificationCheck;

/// Where the subjects of a run currently are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubjectCounts {
    /// Subjects scheduled at initialization.
    pub scheduled: u64,
    /// Subjects whose Arrival has fired.
    pub arrived: u64,
    /// Subjects waiting in line.
    pub waiting: u64,
    /// Subjects holding a server slot.
    pub in_service: u64,
    /// Subjects whose service has ended.
    pub served: u64,
}

/// Outcome of [`verify_conservation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConservationResult {
    /// Every arrived subject is accounted for.
    Balanced,
    /// The counts disagree.
    Imbalanced {
        /// `served + in_service + waiting`.
        accounted: u64,
        /// Subjects that have arrived.
        arrived: u64,
    },
}

/// Check that every arrived subject is waiting, in service, or served.
pub fn verify_conservation(counts: &SubjectCounts) -> ConservationResult {
    let accounted = counts
        .served
        .checked_add(counts.in_service)
        .and_then(|n| n.checked_add(counts.waiting));
    match accounted {
        Some(accounted) if accounted == counts.arrived => ConservationResult::Balanced,
        Some(accounted) => ConservationResult::Imbalanced {
            accounted,
            arrived: counts.arrived,
        },
        None => ConservationResult::Imbalanced {
            accounted: u64::MAX,
            arrived: counts.arrived,
        },
    }
}

/// Conservation and completion checks for a run.
///
/// `finished` is whether the future-event list has drained; only then must
/// every scheduled subject have been served.
pub fn conservation_checks(counts: &SubjectCounts, finished: bool) -> Vec<VerificationCheck> {
    let (accounted, balanced) = match verify_conservation(counts) {
        ConservationResult::Balanced => (counts.arrived, true),
        ConservationResult::Imbalanced { accounted, .. } => (accounted, false),
    };

    let served_ok = if finished {
        counts.served == counts.scheduled
    } else {
        counts.served <= counts.scheduled
    };

    vec![
        VerificationCheck::new(
            "Customers Accounted For",
            format!("{accounted}/{}", counts.arrived),
            balanced,
            "LOST CUSTOMERS",
        ),
        VerificationCheck::new(
            "Customers Served",
            format!("{}/{}", counts.served, counts.scheduled),
            served_ok,
            "INCOMPLETE",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn counts(arrived: u64, waiting: u64, in_service: u64, served: u64) -> SubjectCounts {
        SubjectCounts {
            scheduled: 5,
            arrived,
            waiting,
            in_service,
            served,
        }
    }

    #[test]
    fn balanced_midrun() {
        assert_eq!(
            verify_conservation(&counts(4, 1, 2, 1)),
            ConservationResult::Balanced
        );
    }

    #[test]
    fn detects_lost_subject() {
        assert_eq!(
            verify_conservation(&counts(4, 0, 2, 1)),
            ConservationResult::Imbalanced {
                accounted: 3,
                arrived: 4
            }
        );
    }

    #[test]
    fn checks_render() {
        let lines: Vec<String> = conservation_checks(&counts(5, 0, 0, 5), true)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            lines,
            vec!["Customers Accounted For: 5/5 ✓", "Customers Served: 5/5 ✓"]
        );
    }

    #[test]
    fn unfinished_run_is_not_incomplete() {
        let checks = conservation_checks(&counts(3, 1, 1, 1), false);
        assert!(checks.iter().all(|c| c.passed));
        let checks = conservation_checks(&counts(3, 1, 1, 1), true);
        assert!(!checks.iter().all(|c| c.passed));
    }
}

//! Per-iteration and cumulative error counters.

use serde::{Deserialize, Serialize};

/// Result of closing one iteration's tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationTally {
    /// Errors counted during the iteration.
    pub local: u64,
    /// Whether the iteration counted as affected.
    pub affected: bool,
}

/// Error counters for one region of a run (warm-up or measured).
///
/// `total_errors` and `affected_iterations` only ever grow. `local_errors`
/// is reset by [`Self::begin_iteration`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorAccounting {
    local_errors: u64,
    total_errors: u64,
    affected_iterations: u64,
    iterations: u64,
    checksum_errors: u64,
    golden_inconsistencies: u64,
}

impl ErrorAccounting {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_iteration(&mut self) {
        self.local_errors = 0;
    }

    /// Add `n` errors to the local and cumulative counts.
    pub fn record(&mut self, n: u64) {
        self.local_errors = self.local_errors.saturating_add(n);
        self.total_errors = self.total_errors.saturating_add(n);
    }

    /// A derived checksum disagreed while the element scan was clean.
    /// Counts as one error.
    pub fn record_checksum_error(&mut self) {
        self.checksum_errors = self.checksum_errors.saturating_add(1);
        self.record(1);
    }

    /// A golden buffer failed its seal. Tracked apart from data errors.
    pub fn record_golden_inconsistency(&mut self) {
        self.golden_inconsistencies = self.golden_inconsistencies.saturating_add(1);
    }

    pub fn end_iteration(&mut self) -> IterationTally {
        let affected = self.local_errors > 0;
        if affected {
            self.affected_iterations = self.affected_iterations.saturating_add(1);
        }
        self.iterations = self.iterations.saturating_add(1);
        IterationTally {
            local: self.local_errors,
            affected,
        }
    }

    #[must_use]
    pub fn local_errors(&self) -> u64 {
        self.local_errors
    }

    #[must_use]
    pub fn total_errors(&self) -> u64 {
        self.total_errors
    }

    #[must_use]
    pub fn affected_iterations(&self) -> u64 {
        self.affected_iterations
    }

    /// Iterations closed in this region.
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    #[must_use]
    pub fn checksum_errors(&self) -> u64 {
        self.checksum_errors
    }

    #[must_use]
    pub fn golden_inconsistencies(&self) -> u64 {
        self.golden_inconsistencies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_iteration_is_not_affected() {
        let mut acct = ErrorAccounting::new();
        acct.begin_iteration();
        let tally = acct.end_iteration();
        assert_eq!(
            tally,
            IterationTally {
                local: 0,
                affected: false
            }
        );
        assert_eq!(acct.affected_iterations(), 0);
        assert_eq!(acct.iterations(), 1);
    }

    #[test]
    fn local_resets_and_totals_accumulate() {
        let mut acct = ErrorAccounting::new();
        acct.begin_iteration();
        acct.record(3);
        acct.record(2);
        assert_eq!(acct.end_iteration().local, 5);

        acct.begin_iteration();
        assert_eq!(acct.local_errors(), 0, "case=local_reset");
        acct.record(1);
        acct.end_iteration();

        assert_eq!(acct.total_errors(), 6);
        assert_eq!(acct.affected_iterations(), 2);
    }

    #[test]
    fn checksum_error_counts_once_in_both_tallies() {
        let mut acct = ErrorAccounting::new();
        acct.begin_iteration();
        acct.record_checksum_error();
        assert_eq!(acct.local_errors(), 1);
        assert_eq!(acct.checksum_errors(), 1);
        assert!(acct.end_iteration().affected);
    }

    #[test]
    fn golden_inconsistency_is_not_a_data_error() {
        let mut acct = ErrorAccounting::new();
        acct.begin_iteration();
        acct.record_golden_inconsistency();
        let tally = acct.end_iteration();
        assert!(!tally.affected);
        assert_eq!(acct.golden_inconsistencies(), 1);
        assert_eq!(acct.total_errors(), 0);
    }
}

//! Element-wise comparison with in-place repair.

use seubench_error::{BenchError, Result};

use crate::word::Word;

/// One mismatching element, captured before repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch<W> {
    pub index: usize,
    pub expected: W,
    pub actual: W,
}

/// Outcome of a single [`compare_and_repair`] scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport<W> {
    /// Number of mismatching elements found (and repaired).
    pub errors: usize,
    /// The first `capture` mismatches in index order.
    pub mismatches: Vec<Mismatch<W>>,
}

impl<W> ErrorReport<W> {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }

    /// Mismatches counted but not captured.
    #[must_use]
    pub fn omitted(&self) -> usize {
        self.errors.saturating_sub(self.mismatches.len())
    }
}

/// Compare `candidate` against `golden`, overwriting every mismatching
/// candidate element with the golden value.
///
/// After a successful call `candidate == golden` element-wise. Up to
/// `capture` mismatches are kept in the report for logging; all of them are
/// counted.
pub fn compare_and_repair<W: Word>(
    candidate: &mut [W],
    golden: &[W],
    capture: usize,
) -> Result<ErrorReport<W>> {
    if candidate.len() != golden.len() {
        return Err(BenchError::ShapeMismatch {
            candidate: candidate.len(),
            golden: golden.len(),
        });
    }

    let mut errors = 0_usize;
    let mut mismatches = Vec::new();
    for (index, (actual, &expected)) in candidate.iter_mut().zip(golden).enumerate() {
        if *actual != expected {
            if mismatches.len() < capture {
                mismatches.push(Mismatch {
                    index,
                    expected,
                    actual: *actual,
                });
            }
            *actual = expected;
            errors += 1;
        }
    }

    Ok(ErrorReport { errors, mismatches })
}

//! Memory pattern kernel.
//!
//! A fixed array `a[i] = i` sits in memory for the whole run. Each iteration
//! reads it back: the sum is accumulated while reading, every element is
//! compared against its index and repaired, and the sum is then checked
//! against `n(n-1)/2` to catch faults in the arithmetic path.

use seubench_core::{ChecksumMismatch, HeaderField, Kernel, Stage, tags};

/// Tag of the sum check sub-block.
pub const SUM_TAG: &str = "S";

/// Default array length.
pub const DEFAULT_ELEMENTS: usize = 600;

const STAGES: [Stage; 1] = [Stage::new(tags::POST_OPERATION, 0)];

/// Expected sum of `0..len`.
#[must_use]
pub const fn sum_constant(len: usize) -> i64 {
    let n = len as i64;
    n * (n - 1) / 2
}

#[derive(Debug, Clone)]
pub struct CachePattern {
    len: usize,
    /// Running sum of the last read pass. Exposed to fault injection as the
    /// single input word: it models the adder and its register.
    accumulated: i64,
}

impl CachePattern {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            len,
            accumulated: sum_constant(len),
        }
    }

    #[must_use]
    pub fn accumulated(&self) -> i64 {
        self.accumulated
    }
}

impl Default for CachePattern {
    fn default() -> Self {
        Self::new(DEFAULT_ELEMENTS)
    }
}

impl Kernel for CachePattern {
    type Word = i32;

    fn name(&self) -> &'static str {
        "cache"
    }

    fn header_fields(&self) -> Vec<HeaderField> {
        vec![HeaderField::new("array_size", self.len)]
    }

    fn output_len(&self) -> usize {
        self.len
    }

    fn stages(&self) -> &[Stage] {
        &STAGES
    }

    // The pattern does not depend on the seed.
    fn generate_inputs(&mut self, _seed: u64) {}

    fn expected_outputs(&self, _slot: usize, out: &mut [i32]) {
        for (index, word) in out.iter_mut().enumerate() {
            *word = index as i32;
        }
    }

    /// The array is the candidate buffer itself and persists across
    /// iterations; running the kernel only reads it.
    fn run(&mut self, _stage: usize, output: &mut [i32]) {
        self.accumulated = output.iter().map(|&word| i64::from(word)).sum();
    }

    fn secondary_check(&self, _stage: usize, _output: &[i32]) -> Option<ChecksumMismatch> {
        let expected = sum_constant(self.len);
        (self.accumulated != expected).then(|| ChecksumMismatch {
            tag: SUM_TAG,
            expected: i128::from(expected),
            actual: i128::from(self.accumulated),
        })
    }

    fn input_words(&self) -> usize {
        1
    }

    fn flip_input_bit(&mut self, word: usize, bit: u32) -> bool {
        if word != 0 {
            return false;
        }
        self.accumulated ^= 1 << (bit % 32);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_constant_matches_default_array() {
        assert_eq!(sum_constant(DEFAULT_ELEMENTS), 179_700, "case=600_elements");
        assert_eq!(sum_constant(1), 0, "case=single");
    }

    #[test]
    fn corrupted_read_changes_the_sum() {
        let mut kernel = CachePattern::new(8);
        let mut array = vec![0; 8];
        kernel.expected_outputs(0, &mut array);
        kernel.run(0, &mut array);
        assert!(kernel.secondary_check(0, &array).is_none(), "case=clean");

        array[3] ^= 0x40;
        kernel.run(0, &mut array);
        let mismatch = kernel.secondary_check(0, &array).expect("sum differs");
        assert_eq!(mismatch.expected, 28, "case=expected");
        assert_eq!(mismatch.actual, 28 + 0x40, "case=actual");
    }

    #[test]
    fn accumulator_flip_is_a_checksum_fault() {
        let mut kernel = CachePattern::new(8);
        let mut array = vec![0; 8];
        kernel.expected_outputs(0, &mut array);
        kernel.run(0, &mut array);
        assert!(kernel.flip_input_bit(0, 2), "case=flipped");
        assert!(!kernel.flip_input_bit(1, 2), "case=single_word");
        assert!(kernel.secondary_check(0, &array).is_some(), "case=detected");
    }
}

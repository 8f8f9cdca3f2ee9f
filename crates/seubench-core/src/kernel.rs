//! The pluggable computation a benchmark exercises.

use crate::word::Word;

/// Standard record tags.
pub mod tags {
    /// Inputs checked before the operation runs.
    pub const PRE_CHECK: &str = "S";
    /// Output checked after the operation.
    pub const POST_OPERATION: &str = "E";
    /// Output checked after the inverse operation restored it.
    pub const POST_REPAIR: &str = "D";
    /// Prefix for golden-inconsistency fields, followed by the stage tag.
    pub const GOLDEN_PREFIX: &str = "G_";
}

/// One checked step of an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    /// Key of the sub-block this stage logs under; unique within a kernel.
    pub tag: &'static str,
    /// Golden slot the stage output is compared against.
    pub golden_slot: usize,
}

impl Stage {
    #[must_use]
    pub const fn new(tag: &'static str, golden_slot: usize) -> Self {
        Self { tag, golden_slot }
    }
}

/// A `key: value` line of the log header contributed by a kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub key: &'static str,
    pub value: String,
}

impl HeaderField {
    pub fn new(key: &'static str, value: impl ToString) -> Self {
        Self {
            key,
            value: value.to_string(),
        }
    }
}

/// A derived checksum that disagreed with its expected constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumMismatch {
    pub tag: &'static str,
    pub expected: i128,
    pub actual: i128,
}

/// A computation kernel driven by [`crate::IterationEngine`].
///
/// The engine owns the candidate output buffer and the golden buffers; the
/// kernel owns its inputs. Each iteration runs every stage in order: the
/// kernel writes the stage's result into the candidate buffer, and the engine
/// checks it against the stage's golden slot and repairs it before the next
/// stage runs.
pub trait Kernel {
    type Word: Word;

    /// Value of the `test:` header field.
    fn name(&self) -> &'static str;

    /// Kernel-specific header fields such as buffer dimensions.
    fn header_fields(&self) -> Vec<HeaderField> {
        Vec::new()
    }

    /// Element count of the candidate buffer and of every golden slot.
    fn output_len(&self) -> usize;

    /// Stages of one iteration, in execution order.
    fn stages(&self) -> &[Stage];

    /// Number of golden slots the stages refer to.
    fn golden_slots(&self) -> usize {
        1
    }

    /// Rebuild every input buffer from `seed`.
    fn generate_inputs(&mut self, seed: u64);

    /// Write the expected output for golden `slot` given the current inputs.
    fn expected_outputs(&self, slot: usize, out: &mut [Self::Word]);

    /// Run `stage`, leaving its result in `output`.
    fn run(&mut self, stage: usize, output: &mut [Self::Word]);

    /// Secondary check over a stage output whose element scan was clean.
    fn secondary_check(&self, _stage: usize, _output: &[Self::Word]) -> Option<ChecksumMismatch> {
        None
    }

    /// Render an element index for the log.
    fn format_index(&self, index: usize) -> String {
        index.to_string()
    }

    /// Number of input words exposed to fault injection.
    fn input_words(&self) -> usize {
        0
    }

    /// Flip one bit of input word `word`. Returns false when out of range.
    fn flip_input_bit(&mut self, _word: usize, _bit: u32) -> bool {
        false
    }
}

//! Quicksort kernel: two forward sorts and two "reverse" sorts per iteration.
//!
//! Stage `E0` sorts freshly loaded input; the other three stages re-sort the
//! already sorted output in place.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use seubench_core::{HeaderField, Kernel, Stage};

pub const DEFAULT_ELEMENTS: usize = 580;

const SLOT_FORWARD: usize = 0;
const SLOT_REVERSE: usize = 1;

const STAGES: [Stage; 4] = [
    Stage::new("E0", SLOT_FORWARD),
    Stage::new("E1", SLOT_FORWARD),
    Stage::new("E2", SLOT_REVERSE),
    Stage::new("E3", SLOT_REVERSE),
];

/// Hoare-partition quicksort with the middle element as pivot.
pub fn quick_sort(values: &mut [i32]) {
    if values.len() < 2 {
        return;
    }
    let split = partition(values);
    let (left, right) = values.split_at_mut(split);
    quick_sort(left);
    quick_sort(right);
}

/// Same partition as [`quick_sort`], recursing into the upper part first.
///
/// Despite the name the result is ascending, identical to [`quick_sort`];
/// only the order of the recursive calls differs.
pub fn quick_sort_rev(values: &mut [i32]) {
    if values.len() < 2 {
        return;
    }
    let split = partition(values);
    let (left, right) = values.split_at_mut(split);
    quick_sort_rev(right);
    quick_sort_rev(left);
}

// Requires len >= 2. Returns a split point in 1..len.
fn partition(values: &mut [i32]) -> usize {
    let pivot = values[values.len() / 2];
    let mut i = 0;
    let mut j = values.len() - 1;
    loop {
        while values[i] < pivot {
            i += 1;
        }
        while values[j] > pivot {
            j -= 1;
        }
        if i >= j {
            return i;
        }
        values.swap(i, j);
        i += 1;
        j -= 1;
    }
}

#[derive(Debug, Clone)]
pub struct Quicksort {
    input: Vec<i32>,
}

impl Quicksort {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            input: vec![0; len],
        }
    }

    #[must_use]
    pub fn input(&self) -> &[i32] {
        &self.input
    }
}

impl Default for Quicksort {
    fn default() -> Self {
        Self::new(DEFAULT_ELEMENTS)
    }
}

impl Kernel for Quicksort {
    type Word = i32;

    fn name(&self) -> &'static str {
        "QSort"
    }

    fn header_fields(&self) -> Vec<HeaderField> {
        vec![HeaderField::new("array_size", self.input.len())]
    }

    fn output_len(&self) -> usize {
        self.input.len()
    }

    fn stages(&self) -> &[Stage] {
        &STAGES
    }

    fn golden_slots(&self) -> usize {
        2
    }

    fn generate_inputs(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        for value in &mut self.input {
            *value = rng.gen_range(0..=i32::MAX);
        }
    }

    fn expected_outputs(&self, slot: usize, out: &mut [i32]) {
        out.copy_from_slice(&self.input);
        if slot == SLOT_REVERSE {
            quick_sort_rev(out);
        } else {
            quick_sort(out);
        }
    }

    fn run(&mut self, stage: usize, output: &mut [i32]) {
        match stage {
            0 => {
                output.copy_from_slice(&self.input);
                quick_sort(output);
            }
            1 => quick_sort(output),
            _ => quick_sort_rev(output),
        }
    }

    fn input_words(&self) -> usize {
        self.input.len()
    }

    fn flip_input_bit(&mut self, word: usize, bit: u32) -> bool {
        match self.input.get_mut(word) {
            Some(value) => {
                *value ^= 1 << (bit % 32);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sorts_small_arrays() {
        let mut values = [5, 1, 4, 1, 5, 9, 2, 6];
        quick_sort(&mut values);
        assert_eq!(values, [1, 1, 2, 4, 5, 5, 6, 9], "case=forward");

        let mut values = [3, 3, 3];
        quick_sort_rev(&mut values);
        assert_eq!(values, [3, 3, 3], "case=duplicates");
    }

    #[test]
    fn both_goldens_are_ascending() {
        let mut kernel = Quicksort::new(64);
        kernel.generate_inputs(9);
        let mut forward = vec![0; 64];
        let mut reverse = vec![0; 64];
        kernel.expected_outputs(SLOT_FORWARD, &mut forward);
        kernel.expected_outputs(SLOT_REVERSE, &mut reverse);
        assert_eq!(forward, reverse, "case=same_order");
        assert!(forward.windows(2).all(|w| w[0] <= w[1]), "case=ascending");
    }

    proptest! {
        #[test]
        fn prop_both_sorts_agree_with_std(mut values in prop::collection::vec(any::<i32>(), 0..300)) {
            let mut expected = values.clone();
            expected.sort_unstable();
            let mut reverse = values.clone();
            quick_sort(&mut values);
            quick_sort_rev(&mut reverse);
            prop_assert_eq!(&values, &expected, "case=forward");
            prop_assert_eq!(&reverse, &expected, "case=reverse");
        }
    }
}

//! Small two-stage kernel shared by the engine integration tests.

#![allow(dead_code)]

use seubench_core::{Kernel, Stage, tags};

const STAGES: [Stage; 2] = [
    Stage::new(tags::POST_OPERATION, 0),
    Stage::new(tags::POST_REPAIR, 1),
];

/// Masks a seeded input in stage `E` and unmasks it again in stage `D`.
#[derive(Debug, Clone)]
pub struct MaskKernel {
    pub input: Vec<u16>,
    pub mask: u16,
    pub generated: Vec<u64>,
}

impl MaskKernel {
    pub fn new(len: usize) -> Self {
        Self {
            input: vec![0; len],
            mask: 0,
            generated: Vec::new(),
        }
    }
}

impl Kernel for MaskKernel {
    type Word = u16;

    fn name(&self) -> &'static str {
        "mask"
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
        self.generated.push(seed);
        self.mask = (seed as u16).wrapping_mul(0x9e37) | 1;
        for (i, word) in self.input.iter_mut().enumerate() {
            *word = (seed as u16).wrapping_add(i as u16).rotate_left(3);
        }
    }

    fn expected_outputs(&self, slot: usize, out: &mut [u16]) {
        for (dst, src) in out.iter_mut().zip(&self.input) {
            *dst = if slot == 0 { src ^ self.mask } else { *src };
        }
    }

    fn run(&mut self, stage: usize, output: &mut [u16]) {
        if stage == 0 {
            self.expected_outputs(0, output);
        } else {
            for word in output.iter_mut() {
                *word ^= self.mask;
            }
        }
    }

    fn input_words(&self) -> usize {
        self.input.len()
    }

    fn flip_input_bit(&mut self, word: usize, bit: u32) -> bool {
        match self.input.get_mut(word) {
            Some(slot) => {
                *slot ^= 1 << (bit % 16);
                true
            }
            None => false,
        }
    }
}

//! Square matrix multiply kernel and its unchecked recorded variant.

use std::io::Write;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use seubench_core::{
    EngineConfig, HeaderField, InputScheduler, Kernel, LoopCount, RecordWriter, Stage,
    SyncMarkers, tags,
};
use seubench_error::{BenchError, Result};

pub const DEFAULT_SIDE: usize = 12;

/// Largest generated element. Keeps every product and row sum inside `u64`.
pub const MAX_ELEMENT: i32 = 0x7fff;

const STAGES: [Stage; 1] = [Stage::new(tags::POST_OPERATION, 0)];

/// Which matrix program to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatrixVariant {
    /// Golden-checked multiply inside the iteration engine.
    #[default]
    Checked,
    /// Multiply `loop_count` times without checking, dump every product.
    Recorded,
}

/// `result = first × second` for `side × side` row-major matrices.
pub fn multiply(first: &[i32], second: &[i32], side: usize, result: &mut [u64]) {
    for row in 0..side {
        for column in 0..side {
            let mut sum = 0_u64;
            for k in 0..side {
                let product = u64::from(first[row * side + k].unsigned_abs())
                    .wrapping_mul(u64::from(second[k * side + column].unsigned_abs()));
                sum = sum.wrapping_add(product);
            }
            result[row * side + column] = sum;
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatrixMultiply {
    side: usize,
    first: Vec<i32>,
    second: Vec<i32>,
}

impl MatrixMultiply {
    #[must_use]
    pub fn new(side: usize) -> Self {
        Self {
            side,
            first: vec![0; side * side],
            second: vec![0; side * side],
        }
    }

    #[must_use]
    pub fn side(&self) -> usize {
        self.side
    }
}

impl Default for MatrixMultiply {
    fn default() -> Self {
        Self::new(DEFAULT_SIDE)
    }
}

impl Kernel for MatrixMultiply {
    type Word = u64;

    fn name(&self) -> &'static str {
        "MM"
    }

    fn header_fields(&self) -> Vec<HeaderField> {
        vec![HeaderField::new("matrix_side", self.side)]
    }

    fn output_len(&self) -> usize {
        self.side * self.side
    }

    fn stages(&self) -> &[Stage] {
        &STAGES
    }

    fn generate_inputs(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        // Interleaved fill, one element of each matrix per position.
        for (a, b) in self.first.iter_mut().zip(self.second.iter_mut()) {
            *a = rng.gen_range(0..=MAX_ELEMENT);
            *b = rng.gen_range(0..=MAX_ELEMENT);
        }
    }

    fn expected_outputs(&self, _slot: usize, out: &mut [u64]) {
        multiply(&self.first, &self.second, self.side, out);
    }

    fn run(&mut self, _stage: usize, output: &mut [u64]) {
        multiply(&self.first, &self.second, self.side, output);
    }

    fn format_index(&self, index: usize) -> String {
        format!("{}_{}", index / self.side, index % self.side)
    }

    fn input_words(&self) -> usize {
        self.first.len() + self.second.len()
    }

    fn flip_input_bit(&mut self, word: usize, bit: u32) -> bool {
        let len = self.first.len();
        let slot = if word < len {
            self.first.get_mut(word)
        } else {
            self.second.get_mut(word - len)
        };
        match slot {
            Some(value) => {
                *value ^= 1 << (bit % 32);
                true
            }
            None => false,
        }
    }
}

/// Products kept by [`record_products`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedReport {
    pub test: String,
    pub side: usize,
    pub seed: u64,
    pub products: Vec<Vec<u64>>,
}

impl RecordedReport {
    #[must_use]
    pub fn triage_line(&self) -> String {
        format!(
            "RECORDED: {} {} products of side {} from seed {}",
            self.test,
            self.products.len(),
            self.side,
            self.seed
        )
    }
}

/// Unchecked variant: multiply `loop_count` times between the markers and
/// dump every result after the end marker for offline comparison.
///
/// The seed is derived once at iteration 0 and kept, so every product is
/// expected to be identical.
pub fn record_products<W: Write, M: SyncMarkers>(
    side: usize,
    config: &EngineConfig,
    sink: W,
    mut markers: M,
) -> Result<RecordedReport> {
    config.validate()?;
    let LoopCount::Fixed(loops) = config.loop_count else {
        return Err(BenchError::invalid_config(
            "loop_count",
            "the recorded matrix variant keeps every product and needs a fixed loop count",
        ));
    };
    let count = usize::try_from(loops)
        .map_err(|_| BenchError::invalid_config("loop_count", "too many products to keep"))?;

    let mut kernel = MatrixMultiply::new(side);
    let mut writer = RecordWriter::new(sink, config.printing);
    let mut fields = kernel.header_fields();
    fields.push(HeaderField::new("variant", "recorded"));
    writer.write_header(kernel.name(), config, &fields)?;

    let seed = InputScheduler::new(config.change_rate).seed_for(0);
    let mut products = vec![vec![0_u64; kernel.output_len()]; count];

    markers.start(0);
    for product in &mut products {
        kernel.generate_inputs(seed);
        kernel.run(0, product);
    }
    markers.end(loops);

    for (index, product) in products.iter().enumerate() {
        let mut block = format!("Result Matrix {index}:\n");
        for row in product.chunks(side.max(1)) {
            for value in row {
                block.push_str(&value.to_string());
                block.push(' ');
            }
            block.push('\n');
        }
        writer.write_raw(&block)?;
    }
    writer.sentinel()?;

    info!(target: "seubench.engine", products = count, side, seed, "recorded matrix run complete");
    Ok(RecordedReport {
        test: kernel.name().to_owned(),
        side,
        seed,
        products,
    })
}

//! Benchmark configuration: engine settings plus kernel dimensions.
//!
//! Loaded from TOML; every key is optional.
//!
//! ```toml
//! kernel = "qsort"
//! loop_count = 1000        # or "unbounded"
//! warmup_count = 2
//! change_rate = 1
//! printing = "robust"      # or "terse"
//! sort_elements = 580
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use seubench_core::{EngineConfig, LoopCount, PrintMode, RunHeader};
use seubench_error::{BenchError, Result};

use crate::aes::AesSuite;
use crate::kind::KernelKind;
use crate::matrix::MatrixVariant;
use crate::{cache, matrix, qsort};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub kernel: KernelKind,
    pub loop_count: LoopCount,
    pub warmup_count: u64,
    /// Iterations between fresh reseeds; the kernel's own default when unset.
    pub change_rate: Option<u64>,
    pub printing: PrintMode,
    pub max_logged_pairs: usize,
    /// Heartbeat lines; on for every kernel but AES when unset.
    pub heartbeat: Option<bool>,
    #[serde(flatten)]
    pub header: RunHeader,
    pub array_elements: usize,
    pub sort_elements: usize,
    pub matrix_side: usize,
    pub matrix_variant: MatrixVariant,
    /// AES suites to walk, in order. Empty selects all four.
    pub aes_suites: Vec<AesSuite>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            kernel: KernelKind::default(),
            loop_count: engine.loop_count,
            warmup_count: engine.warmup_count,
            change_rate: None,
            printing: engine.printing,
            max_logged_pairs: engine.max_logged_pairs,
            heartbeat: None,
            header: engine.header,
            array_elements: cache::DEFAULT_ELEMENTS,
            sort_elements: qsort::DEFAULT_ELEMENTS,
            matrix_side: matrix::DEFAULT_SIDE,
            matrix_variant: MatrixVariant::default(),
            aes_suites: Vec::new(),
        }
    }
}

impl BenchConfig {
    /// Defaults for `kernel`.
    #[must_use]
    pub fn for_kernel(kernel: KernelKind) -> Self {
        Self {
            kernel,
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| BenchError::Config {
            detail: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text).map_err(|e| match e {
            BenchError::Config { detail } => BenchError::Config {
                detail: format!("{}: {detail}", path.display()),
            },
            other => other,
        })
    }

    /// Change rate after applying the kernel default.
    #[must_use]
    pub fn effective_change_rate(&self) -> u64 {
        self.change_rate.unwrap_or(match (self.kernel, self.matrix_variant) {
            (KernelKind::Matrix, MatrixVariant::Recorded) => 500,
            _ => 1,
        })
    }

    #[must_use]
    pub fn effective_heartbeat(&self) -> bool {
        self.heartbeat.unwrap_or(self.kernel != KernelKind::Aes)
    }

    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            loop_count: self.loop_count,
            warmup_count: self.warmup_count,
            change_rate: self.effective_change_rate(),
            printing: self.printing,
            max_logged_pairs: self.max_logged_pairs,
            heartbeat: self.effective_heartbeat(),
            header: self.header.clone(),
        }
    }

    /// Reject settings no kernel can run with.
    pub fn validate(&self) -> Result<()> {
        self.engine_config().validate()?;
        let dimension = match self.kernel {
            KernelKind::Aes => None,
            KernelKind::Cache => Some(("array_elements", self.array_elements)),
            KernelKind::Matrix => Some(("matrix_side", self.matrix_side)),
            KernelKind::Qsort => Some(("sort_elements", self.sort_elements)),
        };
        if let Some((field, 0)) = dimension {
            return Err(BenchError::invalid_config(field, "must be greater than zero"));
        }
        if self.kernel == KernelKind::Cache {
            // The sum check accumulates into i64 and elements are i32 indices.
            if i32::try_from(self.array_elements).is_err() {
                return Err(BenchError::invalid_config(
                    "array_elements",
                    "must fit the element type",
                ));
            }
        }
        Ok(())
    }
}

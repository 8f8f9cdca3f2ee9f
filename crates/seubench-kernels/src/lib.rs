//! The four benchmark kernels and the entry point that runs one of them.

pub mod aes;
pub mod cache;
pub mod config;
pub mod kind;
pub mod matrix;
pub mod qsort;

use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::info;

use seubench_core::{BitFlipInjector, EngineConfig, IterationEngine, Kernel, RunReport, SyncMarkers};
use seubench_error::Result;

pub use aes::{AesKat, AesSuite, KnownAnswer};
pub use cache::CachePattern;
pub use config::BenchConfig;
pub use kind::KernelKind;
pub use matrix::{MatrixMultiply, MatrixVariant, RecordedReport};
pub use qsort::Quicksort;

/// What a configured run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "lowercase")]
pub enum RunOutcome {
    Checked(RunReport),
    Recorded(RecordedReport),
}

impl RunOutcome {
    #[must_use]
    pub fn triage_line(&self) -> String {
        match self {
            Self::Checked(report) => report.triage_line(),
            Self::Recorded(report) => report.triage_line(),
        }
    }

    /// Warm-up was clean (always true for the unchecked variant).
    #[must_use]
    pub fn warmup_clean(&self) -> bool {
        match self {
            Self::Checked(report) => report.warmup_clean(),
            Self::Recorded(_) => true,
        }
    }
}

/// Validate `config` and run the selected kernel to completion, writing the
/// structured log to `sink`.
pub fn run_configured<W: Write, M: SyncMarkers>(
    config: &BenchConfig,
    sink: W,
    markers: M,
    faults: Option<BitFlipInjector>,
) -> Result<RunOutcome> {
    config.validate()?;
    let engine_config = config.engine_config();
    info!(
        target: "seubench.engine",
        kernel = %config.kernel,
        loop_count = %engine_config.loop_count,
        change_rate = engine_config.change_rate,
        "starting benchmark"
    );

    let report = match config.kernel {
        KernelKind::Aes => run_engine(
            AesKat::new(&config.aes_suites),
            engine_config,
            sink,
            markers,
            faults,
        )?,
        KernelKind::Cache => run_engine(
            CachePattern::new(config.array_elements),
            engine_config,
            sink,
            markers,
            faults,
        )?,
        KernelKind::Matrix => match config.matrix_variant {
            MatrixVariant::Checked => run_engine(
                MatrixMultiply::new(config.matrix_side),
                engine_config,
                sink,
                markers,
                faults,
            )?,
            MatrixVariant::Recorded => {
                let recorded =
                    matrix::record_products(config.matrix_side, &engine_config, sink, markers)?;
                return Ok(RunOutcome::Recorded(recorded));
            }
        },
        KernelKind::Qsort => run_engine(
            Quicksort::new(config.sort_elements),
            engine_config,
            sink,
            markers,
            faults,
        )?,
    };
    Ok(RunOutcome::Checked(report))
}

fn run_engine<K: Kernel, W: Write, M: SyncMarkers>(
    kernel: K,
    config: EngineConfig,
    sink: W,
    markers: M,
    faults: Option<BitFlipInjector>,
) -> Result<RunReport> {
    let mut engine = IterationEngine::new(kernel, config, sink)?
        .with_markers(markers)
        .with_faults(faults);
    let report = engine.run()?;
    if let Some(injector) = engine.faults() {
        info!(
            target: "seubench.engine",
            injected = injector.injected().len(),
            "fault injection summary"
        );
    }
    Ok(report)
}

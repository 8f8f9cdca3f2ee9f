//! Iteration engine: the self-checking loop around a [`Kernel`].
//!
//! ```text
//!  IterationEngine::new(kernel, config, sink)
//!    ├── init()          header, initial seed, inputs, goldens
//!    ├── warm_up()       warmup_count iterations, ` - w:` records
//!    ├── run_measured()  start marker, loop_count iterations, end marker
//!    └── finish()        sentinel → RunReport
//! ```
//!
//! One iteration applies the scheduler decision left by the previous one,
//! runs every kernel stage, verifies each stage against its golden slot
//! (seal, element scan with repair, secondary check), closes the record, and
//! asks the scheduler what the next iteration needs.
//!
//! The engine is deterministic: same kernel, config, seed and injector give
//! the same log byte for byte. It does not spawn threads; callers drive it
//! through [`IterationEngine::run`] or phase by phase.

use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use seubench_error::{BenchError, Result};

use crate::accounting::ErrorAccounting;
use crate::compare::compare_and_repair;
use crate::config::{EngineConfig, PrintMode};
use crate::fault::{FaultInjector, FaultTarget, NoFaults};
use crate::golden::GoldenReference;
use crate::kernel::{Kernel, Stage};
use crate::markers::{BreakpointMarkers, SyncMarkers};
use crate::record::{RecordKind, RecordWriter};
use crate::scheduler::{InputScheduler, ScheduleDecision, SeedState};

// ---------------------------------------------------------------------------
// Phases and outcomes
// ---------------------------------------------------------------------------

/// Lifecycle phase of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePhase {
    /// Constructed; header not yet written.
    #[default]
    Init,
    /// Inputs and goldens ready; warm-up iterations may run.
    Warmup,
    /// Warm-up finished; start marker not yet reached.
    Armed,
    /// Between the start and end markers.
    Running,
    /// Sentinel written.
    Done,
}

/// Result of a single iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationOutcome {
    pub iteration: u64,
    pub kind: RecordKind,
    /// Data errors counted, checksum errors included.
    pub errors: u64,
    pub checksum_errors: u64,
    pub golden_inconsistencies: u64,
    /// What the scheduler asked of the next iteration.
    pub decision: ScheduleDecision,
    /// Whether the iteration produced a log record.
    pub record_emitted: bool,
}

/// Counters threaded through the loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    iteration: u64,
    phase: EnginePhase,
    measured: ErrorAccounting,
    warmup: ErrorAccounting,
}

impl EngineState {
    /// Next iteration number. Warm-up and measured iterations share it.
    #[must_use]
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    #[must_use]
    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    #[must_use]
    pub fn measured(&self) -> &ErrorAccounting {
        &self.measured
    }

    #[must_use]
    pub fn warmup(&self) -> &ErrorAccounting {
        &self.warmup
    }

    #[must_use]
    pub fn accounting(&self, kind: RecordKind) -> &ErrorAccounting {
        match kind {
            RecordKind::Measured => &self.measured,
            RecordKind::Warmup => &self.warmup,
        }
    }

    fn accounting_mut(&mut self, kind: RecordKind) -> &mut ErrorAccounting {
        match kind {
            RecordKind::Measured => &mut self.measured,
            RecordKind::Warmup => &mut self.warmup,
        }
    }
}

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// Summary of a run, suitable for JSON export next to the YAML log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub test: String,
    pub phase: EnginePhase,
    pub measured: ErrorAccounting,
    pub warmup: ErrorAccounting,
    pub records_emitted: u64,
    pub fresh_reseeds: u64,
    pub replays: u64,
    /// Seed held at the end of the run in log encoding (`-1` = none).
    pub final_seed: i64,
}

impl RunReport {
    /// Warm-up saw no mismatches, so the kernel and comparator agree.
    #[must_use]
    pub fn warmup_clean(&self) -> bool {
        self.warmup.total_errors() == 0 && self.warmup.golden_inconsistencies() == 0
    }

    /// No data errors and no golden inconsistencies in either region.
    #[must_use]
    pub fn clean(&self) -> bool {
        self.warmup_clean()
            && self.measured.total_errors() == 0
            && self.measured.golden_inconsistencies() == 0
    }

    /// One-line summary for operator logs.
    #[must_use]
    pub fn triage_line(&self) -> String {
        if !self.warmup_clean() {
            return format!(
                "WARMUP FAIL: {} {} errors in {} warm-up iterations, {} golden inconsistencies",
                self.test,
                self.warmup.total_errors(),
                self.warmup.affected_iterations(),
                self.warmup.golden_inconsistencies(),
            );
        }
        let verdict = if self.clean() { "CLEAN" } else { "UPSETS" };
        format!(
            "{verdict}: {} {} iterations, {} errors in {} iterations ({} checksum), {} golden inconsistencies, {} records",
            self.test,
            self.measured.iterations(),
            self.measured.total_errors(),
            self.measured.affected_iterations(),
            self.measured.checksum_errors(),
            self.measured.golden_inconsistencies(),
            self.records_emitted,
        )
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct StageVerdict {
    errors: u64,
    checksum_errors: u64,
    golden_inconsistent: bool,
}

/// Drives a kernel through the self-checking loop.
pub struct IterationEngine<K, W, M = BreakpointMarkers, F = NoFaults>
where
    K: Kernel,
    W: Write,
{
    kernel: K,
    config: EngineConfig,
    stages: Vec<Stage>,
    candidate: Vec<K::Word>,
    goldens: Vec<GoldenReference<K::Word>>,
    scheduler: InputScheduler,
    writer: RecordWriter<W>,
    markers: M,
    faults: F,
    state: EngineState,
    pending: ScheduleDecision,
    /// Iteration that produced `pending`; fresh seeds derive from it.
    decided_at: u64,
}

impl<K: Kernel, W: Write> IterationEngine<K, W> {
    /// Validate `config` and the kernel's stage table.
    pub fn new(kernel: K, config: EngineConfig, sink: W) -> Result<Self> {
        config.validate()?;

        let stages = kernel.stages().to_vec();
        if stages.is_empty() {
            return Err(BenchError::internal(format!(
                "kernel {} declares no stages",
                kernel.name()
            )));
        }
        let slots = kernel.golden_slots();
        if let Some(stage) = stages.iter().find(|stage| stage.golden_slot >= slots) {
            return Err(BenchError::internal(format!(
                "stage {} of kernel {} refers to golden slot {} of {slots}",
                stage.tag,
                kernel.name(),
                stage.golden_slot
            )));
        }

        let len = kernel.output_len();
        let writer = RecordWriter::new(sink, config.printing);
        let scheduler = InputScheduler::new(config.change_rate);
        Ok(Self {
            candidate: vec![K::Word::default(); len],
            goldens: (0..slots).map(|_| GoldenReference::new(len)).collect(),
            kernel,
            config,
            stages,
            scheduler,
            writer,
            markers: BreakpointMarkers,
            faults: NoFaults,
            state: EngineState::default(),
            pending: ScheduleDecision::Keep,
            decided_at: 0,
        })
    }
}

impl<K, W, M, F> IterationEngine<K, W, M, F>
where
    K: Kernel,
    W: Write,
    M: SyncMarkers,
    F: FaultInjector<K>,
{
    /// Replace the synchronization markers.
    pub fn with_markers<M2: SyncMarkers>(self, markers: M2) -> IterationEngine<K, W, M2, F> {
        IterationEngine {
            kernel: self.kernel,
            config: self.config,
            stages: self.stages,
            candidate: self.candidate,
            goldens: self.goldens,
            scheduler: self.scheduler,
            writer: self.writer,
            markers,
            faults: self.faults,
            state: self.state,
            pending: self.pending,
            decided_at: self.decided_at,
        }
    }

    /// Attach a fault injector.
    pub fn with_faults<F2: FaultInjector<K>>(self, faults: F2) -> IterationEngine<K, W, M, F2> {
        IterationEngine {
            kernel: self.kernel,
            config: self.config,
            stages: self.stages,
            candidate: self.candidate,
            goldens: self.goldens,
            scheduler: self.scheduler,
            writer: self.writer,
            markers: self.markers,
            faults,
            state: self.state,
            pending: self.pending,
            decided_at: self.decided_at,
        }
    }

    /// Start from `seed` instead of deriving one from the iteration counter.
    #[must_use]
    pub fn with_seed(mut self, seed: SeedState) -> Self {
        self.scheduler = self.scheduler.with_seed(seed);
        self
    }

    // -- lifecycle -----------------------------------------------------------

    /// Run every phase and return the report.
    pub fn run(&mut self) -> Result<RunReport> {
        self.init()?;
        self.warm_up()?;
        self.run_measured()?;
        self.finish()
    }

    /// Write the header, pick the initial seed, build inputs and goldens.
    pub fn init(&mut self) -> Result<()> {
        self.expect_phase(EnginePhase::Init, "init")?;
        let fields = self.kernel.header_fields();
        self.writer
            .write_header(self.kernel.name(), &self.config, &fields)?;

        let seed = self.scheduler.seed_for(self.state.iteration);
        self.regenerate(seed);
        // Stateful kernels (the cache pattern) test the buffer across
        // iterations, so it must start equal to the first stage's golden.
        let first = self.stages[0].golden_slot;
        self.candidate.copy_from_slice(self.goldens[first].words());

        self.state.phase = EnginePhase::Warmup;
        info!(
            target: "seubench.engine",
            test = self.kernel.name(),
            seed,
            stages = self.stages.len(),
            output_len = self.candidate.len(),
            "engine initialized"
        );
        Ok(())
    }

    /// Run the warm-up iterations. Returns the warm-up error count.
    pub fn warm_up(&mut self) -> Result<u64> {
        self.expect_phase(EnginePhase::Warmup, "warm_up")?;
        for _ in 0..self.config.warmup_count {
            self.iterate(RecordKind::Warmup)?;
        }
        let errors = self.state.warmup.total_errors();
        if errors > 0 {
            error!(
                target: "seubench.engine",
                errors,
                affected = self.state.warmup.affected_iterations(),
                "warm-up detected mismatches before the measured region"
            );
        }
        self.state.phase = EnginePhase::Armed;
        Ok(errors)
    }

    /// Fire the start marker, run `loop_count` iterations, fire the end marker.
    pub fn run_measured(&mut self) -> Result<()> {
        self.expect_phase(EnginePhase::Armed, "run_measured")?;
        self.markers.start(self.state.iteration);
        self.state.phase = EnginePhase::Running;

        let mut completed = 0_u64;
        while self.config.loop_count.allows(completed) {
            self.iterate(RecordKind::Measured)?;
            completed += 1;
        }

        self.markers.end(self.state.iteration);
        Ok(())
    }

    /// Emit the terminal sentinel and report.
    pub fn finish(&mut self) -> Result<RunReport> {
        self.expect_phase(EnginePhase::Running, "finish")?;
        self.writer.sentinel()?;
        self.state.phase = EnginePhase::Done;
        let report = self.report();
        info!(target: "seubench.engine", "{}", report.triage_line());
        Ok(report)
    }

    /// Run one iteration of the current phase (warm-up or measured).
    ///
    /// Lets callers drive the loop themselves between [`Self::init`] and
    /// [`Self::finish`]; markers are not fired.
    pub fn step(&mut self) -> Result<IterationOutcome> {
        match self.state.phase() {
            EnginePhase::Warmup => self.iterate(RecordKind::Warmup),
            EnginePhase::Running => self.iterate(RecordKind::Measured),
            EnginePhase::Armed => {
                self.state.phase = EnginePhase::Running;
                self.iterate(RecordKind::Measured)
            }
            phase => Err(BenchError::internal(format!(
                "cannot step an engine in phase {phase:?}"
            ))),
        }
    }

    /// Leave warm-up without running the remaining warm-up iterations.
    pub fn arm(&mut self) -> Result<()> {
        self.expect_phase(EnginePhase::Warmup, "arm")?;
        self.state.phase = EnginePhase::Armed;
        Ok(())
    }

    // -- iteration body ------------------------------------------------------

    fn iterate(&mut self, kind: RecordKind) -> Result<IterationOutcome> {
        let iteration = self.state.iteration;
        let decision = std::mem::replace(&mut self.pending, ScheduleDecision::Keep);
        if let Some(seed) = self.scheduler.resolve(decision, self.decided_at) {
            debug!(
                target: "seubench.scheduler",
                iteration,
                decided_at = self.decided_at,
                ?decision,
                seed,
                "regenerating inputs"
            );
            self.regenerate(seed);
        }

        self.state.accounting_mut(kind).begin_iteration();
        self.writer.begin_record(kind, iteration)?;

        let mut golden_inconsistencies = 0_u64;
        let mut checksum_errors = 0_u64;
        for index in 0..self.stages.len() {
            self.kernel.run(index, &mut self.candidate);
            // Faults are only injected between the markers.
            if kind == RecordKind::Measured {
                self.faults.inject(
                    iteration,
                    index,
                    FaultTarget {
                        kernel: &mut self.kernel,
                        candidate: &mut self.candidate,
                        goldens: &mut self.goldens,
                    },
                );
            }
            let verdict = self.verify_stage(kind, index)?;
            checksum_errors += verdict.checksum_errors;
            if verdict.golden_inconsistent {
                golden_inconsistencies += 1;
            }
        }

        let tally = self.state.accounting_mut(kind).end_iteration();
        let record_emitted = self.writer.end_record()?;

        let next = self.scheduler.decide(tally.local, iteration);
        self.pending = next;
        self.decided_at = iteration;

        if kind == RecordKind::Measured
            && self.config.heartbeat
            && iteration != 0
            && self.scheduler.is_cadence(iteration)
        {
            let measured = &self.state.measured;
            self.writer.heartbeat(
                iteration,
                measured.total_errors(),
                measured.affected_iterations(),
                measured.checksum_errors(),
            )?;
        }

        self.state.iteration = iteration.saturating_add(1);
        Ok(IterationOutcome {
            iteration,
            kind,
            errors: tally.local,
            checksum_errors,
            golden_inconsistencies,
            decision: next,
            record_emitted,
        })
    }

    fn verify_stage(&mut self, kind: RecordKind, index: usize) -> Result<StageVerdict> {
        let stage = self.stages[index];
        let iteration = self.state.iteration;
        let mut verdict = StageVerdict::default();

        let golden = &self.goldens[stage.golden_slot];
        if !golden.is_consistent() {
            let (expected, actual) = (golden.seal(), golden.current_seal());
            warn!(
                target: "seubench.golden",
                iteration,
                stage = stage.tag,
                slot = stage.golden_slot,
                expected_seal = expected,
                actual_seal = actual,
                "golden seal mismatch, regenerating"
            );
            self.writer
                .add_golden_inconsistency(stage.tag, expected, actual)?;
            self.state.accounting_mut(kind).record_golden_inconsistency();
            let seed = self.scheduler.seed_for(iteration);
            self.regenerate(seed);
            verdict.golden_inconsistent = true;
        }

        let capture = match self.config.printing {
            PrintMode::Robust => self.config.max_logged_pairs,
            PrintMode::Terse => 0,
        };
        let report = compare_and_repair(
            &mut self.candidate,
            self.goldens[stage.golden_slot].words(),
            capture,
        )?;
        let errors = report.errors as u64;
        if errors > 0 {
            warn!(
                target: "seubench.engine",
                iteration,
                stage = stage.tag,
                errors,
                "output mismatch repaired"
            );
            self.state.accounting_mut(kind).record(errors);
            let kernel = &self.kernel;
            self.writer
                .add_mismatches(stage.tag, &report, |at| kernel.format_index(at))?;
            verdict.errors = errors;
        }

        if errors == 0 {
            if let Some(mismatch) = self.kernel.secondary_check(index, &self.candidate) {
                warn!(
                    target: "seubench.engine",
                    iteration,
                    tag = mismatch.tag,
                    expected = %mismatch.expected,
                    actual = %mismatch.actual,
                    "secondary checksum mismatch"
                );
                self.state.accounting_mut(kind).record_checksum_error();
                self.writer.add_checksum(&mismatch)?;
                verdict.checksum_errors = 1;
            }
        }

        Ok(verdict)
    }

    fn regenerate(&mut self, seed: u64) {
        self.kernel.generate_inputs(seed);
        let kernel = &self.kernel;
        for (slot, golden) in self.goldens.iter_mut().enumerate() {
            golden.regenerate(seed, |out| kernel.expected_outputs(slot, out));
        }
    }

    fn expect_phase(&self, expected: EnginePhase, operation: &str) -> Result<()> {
        let phase = self.state.phase();
        if phase == expected {
            Ok(())
        } else {
            Err(BenchError::internal(format!(
                "{operation} requires phase {expected:?}, engine is in {phase:?}"
            )))
        }
    }

    // -- accessors -----------------------------------------------------------

    #[must_use]
    pub fn report(&self) -> RunReport {
        RunReport {
            test: self.kernel.name().to_owned(),
            phase: self.state.phase(),
            measured: self.state.measured.clone(),
            warmup: self.state.warmup.clone(),
            records_emitted: self.writer.records_emitted(),
            fresh_reseeds: self.scheduler.fresh_count(),
            replays: self.scheduler.replay_count(),
            final_seed: self.scheduler.seed().to_raw(),
        }
    }

    #[must_use]
    pub fn phase(&self) -> EnginePhase {
        self.state.phase()
    }

    #[must_use]
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    #[must_use]
    pub fn candidate(&self) -> &[K::Word] {
        &self.candidate
    }

    #[must_use]
    pub fn goldens(&self) -> &[GoldenReference<K::Word>] {
        &self.goldens
    }

    #[must_use]
    pub fn scheduler(&self) -> &InputScheduler {
        &self.scheduler
    }

    /// Decision the next iteration will apply.
    #[must_use]
    pub fn pending(&self) -> ScheduleDecision {
        self.pending
    }

    #[must_use]
    pub fn writer(&self) -> &RecordWriter<W> {
        &self.writer
    }

    #[must_use]
    pub fn markers(&self) -> &M {
        &self.markers
    }

    #[must_use]
    pub fn faults(&self) -> &F {
        &self.faults
    }

    /// Give back the log sink.
    pub fn into_sink(self) -> W {
        self.writer.into_inner()
    }
}

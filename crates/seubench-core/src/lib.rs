//! Self-checking iteration engine for single-event-upset (SEU) benchmarks.
//!
//! A benchmark drives a computation kernel in a loop while an external
//! fault-injection harness perturbs memory. Every iteration the engine
//! compares the kernel's output against a golden reference, counts and logs
//! mismatches, repairs the output in place, and reseeds the inputs on a fixed
//! cadence so the loop keeps running through corruption.
//!
//! ```text
//!  IterationEngine::run()
//!    ├── Init     header, seed, inputs, goldens
//!    ├── Warmup   iteration body, no faults expected
//!    ├── Armed    start marker
//!    ├── Running  iteration body × loop_count
//!    │     ├── InputScheduler  apply pending keep/replay/fresh
//!    │     ├── Kernel::run     per stage
//!    │     ├── verify          golden seal → compare_and_repair → secondary check
//!    │     ├── ErrorAccounting tally
//!    │     └── RecordWriter    one record per error-bearing iteration
//!    └── Done     end marker, sentinel
//! ```

pub mod accounting;
pub mod compare;
pub mod config;
pub mod engine;
pub mod fault;
pub mod golden;
pub mod kernel;
pub mod markers;
pub mod record;
pub mod scheduler;
pub mod word;

pub use accounting::{ErrorAccounting, IterationTally};
pub use compare::{ErrorReport, Mismatch, compare_and_repair};
pub use config::{EngineConfig, LoopCount, PrintMode, RunHeader};
pub use engine::{EnginePhase, EngineState, IterationEngine, IterationOutcome, RunReport};
pub use fault::{
    BitFlipInjector, FaultInjector, FaultSite, FaultTarget, InjectedFault, NoFaults,
    ScriptedInjector,
};
pub use golden::GoldenReference;
pub use kernel::{ChecksumMismatch, HeaderField, Kernel, Stage, tags};
pub use markers::{BreakpointMarkers, MarkerEvent, RecordingMarkers, SyncMarkers};
pub use record::{RecordKind, RecordWriter, TERMINAL_SENTINEL};
pub use scheduler::{InputScheduler, ScheduleDecision, SeedState};
pub use word::Word;

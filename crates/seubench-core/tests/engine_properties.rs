mod common;

use common::MaskKernel;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use seubench_core::{
    EngineConfig, FaultSite, InjectedFault, IterationEngine, LoopCount, ScriptedInjector,
    TERMINAL_SENTINEL, compare_and_repair,
};

const LEN: usize = 12;

fn config(loops: u64, warmup: u64, change_rate: u64) -> EngineConfig {
    EngineConfig {
        loop_count: LoopCount::Fixed(loops),
        warmup_count: warmup,
        change_rate,
        max_logged_pairs: 4,
        ..EngineConfig::default()
    }
}

fn output_fault() -> impl Strategy<Value = InjectedFault> {
    (0_u64..40, 0_usize..2, 0_usize..LEN, 0_u32..16).prop_map(|(iteration, stage, word, bit)| {
        InjectedFault {
            iteration,
            stage,
            site: FaultSite::Output,
            word,
            bit,
        }
    })
}

fn any_fault() -> impl Strategy<Value = InjectedFault> {
    let site = prop_oneof![
        Just(FaultSite::Input),
        Just(FaultSite::Output),
        Just(FaultSite::Golden(0)),
        Just(FaultSite::Golden(1)),
    ];
    (0_u64..40, 0_usize..2, site, 0_usize..LEN, 0_u32..16).prop_map(
        |(iteration, stage, site, word, bit)| InjectedFault {
            iteration,
            stage,
            site,
            word,
            bit,
        },
    )
}

fn run_log(plan: Vec<InjectedFault>, cfg: EngineConfig) -> Vec<u8> {
    let mut engine = IterationEngine::new(MaskKernel::new(LEN), cfg, Vec::new())
        .expect("new")
        .with_faults(ScriptedInjector::new(plan));
    engine.run().expect("run");
    engine.into_sink()
}

proptest! {
    #[test]
    fn prop_repair_is_idempotent(
        golden in prop::collection::vec(any::<u32>(), 0..64),
        noise in prop::collection::vec(any::<u32>(), 64),
    ) {
        let mut candidate: Vec<u32> = golden
            .iter()
            .zip(&noise)
            .map(|(g, n)| if n % 3 == 0 { g ^ n } else { *g })
            .collect();
        let first = compare_and_repair(&mut candidate, &golden, 8).expect("same length");
        prop_assert_eq!(&candidate, &golden, "case=repaired");
        prop_assert!(first.mismatches.len() <= 8, "case=capture_capped");
        let second = compare_and_repair(&mut candidate, &golden, 8).expect("same length");
        prop_assert_eq!(second.errors, 0, "case=second_pass_clean");
    }

    #[test]
    fn prop_runs_are_deterministic(plan in prop::collection::vec(any_fault(), 0..12)) {
        let first = run_log(plan.clone(), config(30, 2, 7));
        let second = run_log(plan, config(30, 2, 7));
        prop_assert_eq!(first, second, "case=byte_identical_logs");
    }

    #[test]
    fn prop_counters_are_monotonic(plan in prop::collection::vec(any_fault(), 0..16)) {
        let mut engine = IterationEngine::new(MaskKernel::new(LEN), config(40, 0, 9), Vec::new())
            .expect("new")
            .with_faults(ScriptedInjector::new(plan));
        engine.init().expect("init");
        engine.warm_up().expect("warm_up");
        let mut last_total = 0;
        let mut last_affected = 0;
        for _ in 0..40 {
            engine.step().expect("step");
            let measured = engine.state().measured();
            prop_assert!(measured.total_errors() >= last_total, "case=total_monotonic");
            prop_assert!(measured.affected_iterations() >= last_affected, "case=affected_monotonic");
            prop_assert!(measured.affected_iterations() <= measured.iterations(), "case=affected_bounded");
            prop_assert!(measured.affected_iterations() <= measured.total_errors(), "case=affected_implies_errors");
            last_total = measured.total_errors();
            last_affected = measured.affected_iterations();
        }
    }

    #[test]
    fn prop_fresh_reseeds_follow_cadence(change_rate in 1_u64..12, loops in 1_u64..60) {
        let mut engine = IterationEngine::new(MaskKernel::new(LEN), config(loops, 0, change_rate), Vec::new())
            .expect("new");
        let report = engine.run().expect("run");
        // A fresh decision at iteration i is applied at i + 1, so only
        // cadence points before the last iteration take effect.
        let cadence: Vec<u64> = (0..loops - 1).filter(|i| i % change_rate == 0).collect();
        prop_assert_eq!(report.fresh_reseeds, cadence.len() as u64, "case=fresh_count");
        // Each fresh seed is the counter of the iteration that decided it.
        let mut seeds = vec![0];
        seeds.extend(&cadence);
        prop_assert_eq!(&engine.kernel().generated, &seeds, "case=fresh_seed_values");
        prop_assert_eq!(report.replays, 0, "case=no_replays_when_clean");
    }

    #[test]
    fn prop_log_is_well_formed(plan in prop::collection::vec(output_fault(), 0..10)) {
        let cfg = config(40, 0, 13);
        let mut engine = IterationEngine::new(MaskKernel::new(LEN), cfg, Vec::new())
            .expect("new")
            .with_faults(ScriptedInjector::new(plan));
        let report = engine.run().expect("run");
        prop_assert!(!engine.writer().is_open(), "case=no_open_record");
        let log = String::from_utf8(engine.into_sink()).expect("utf-8");

        let body = log
            .split_once("\nd:\n")
            .map(|(_, body)| body)
            .ok_or_else(|| TestCaseError::fail("case=missing_list_key"))?;
        let body = body
            .strip_suffix(TERMINAL_SENTINEL)
            .ok_or_else(|| TestCaseError::fail("case=missing_sentinel"))?;

        let mut records = 0_u64;
        let mut fields_since_open = None;
        for line in body.lines() {
            if line.starts_with(" - i: ") {
                if let Some(fields) = fields_since_open {
                    prop_assert!(fields > 0, "case=empty_record");
                }
                records += 1;
                fields_since_open = Some(0);
            } else if line.starts_with("   ") {
                match fields_since_open.as_mut() {
                    Some(fields) => *fields += 1,
                    None => return Err(TestCaseError::fail("case=field_outside_record")),
                }
            } else if line.starts_with("# ") {
                if let Some(fields) = fields_since_open.take() {
                    prop_assert!(fields > 0, "case=empty_record_before_heartbeat");
                }
            } else {
                return Err(TestCaseError::fail(format!("case=unexpected_line line={line:?}")));
            }
        }
        prop_assert_eq!(records, report.records_emitted, "case=record_count");
        prop_assert_eq!(records, report.measured.affected_iterations(), "case=one_record_per_affected");
    }
}

mod common;

use common::MaskKernel;
use seubench_core::{
    BitFlipInjector, EngineConfig, EnginePhase, FaultSite, InjectedFault, IterationEngine,
    LoopCount, MarkerEvent, RecordingMarkers, ScriptedInjector, TERMINAL_SENTINEL,
};

fn config(loops: LoopCount, warmup: u64, change_rate: u64) -> EngineConfig {
    EngineConfig {
        loop_count: loops,
        warmup_count: warmup,
        change_rate,
        ..EngineConfig::default()
    }
}

fn fault(iteration: u64, stage: usize, site: FaultSite, word: usize, bit: u32) -> InjectedFault {
    InjectedFault {
        iteration,
        stage,
        site,
        word,
        bit,
    }
}

#[test]
fn repair_between_stages_keeps_later_stages_clean() {
    let plan = vec![fault(4, 0, FaultSite::Output, 2, 11)];
    let mut engine = IterationEngine::new(
        MaskKernel::new(16),
        config(LoopCount::Fixed(6), 2, 50),
        Vec::new(),
    )
    .expect("new")
    .with_faults(ScriptedInjector::new(plan));
    let report = engine.run().expect("run");

    assert_eq!(report.measured.total_errors(), 1, "case=single_error");
    let log = String::from_utf8(engine.into_sink()).expect("utf-8");
    assert!(log.contains(" - i: 4\n   E: {2: ["), "case=e_stage_logged log={log}");
    assert!(!log.contains("   D:"), "case=d_stage_clean log={log}");
}

#[test]
fn both_stages_can_log_in_one_record() {
    let plan = vec![
        fault(1, 0, FaultSite::Output, 0, 0),
        fault(1, 1, FaultSite::Output, 7, 15),
    ];
    let mut engine = IterationEngine::new(
        MaskKernel::new(8),
        config(LoopCount::Fixed(3), 0, 50),
        Vec::new(),
    )
    .expect("new")
    .with_faults(ScriptedInjector::new(plan));
    let report = engine.run().expect("run");

    assert_eq!(report.measured.total_errors(), 2, "case=two_errors");
    assert_eq!(report.measured.affected_iterations(), 1, "case=one_iteration");
    assert_eq!(report.records_emitted, 1, "case=one_record");
    let log = String::from_utf8(engine.into_sink()).expect("utf-8");
    let record = log
        .split(" - i: 1\n")
        .nth(1)
        .expect("record for iteration 1");
    assert!(record.starts_with("   E: {0: ["), "case=e_first record={record}");
    assert!(record.contains("\n   D: {7: ["), "case=d_second record={record}");
}

#[test]
fn golden_flip_on_second_slot_is_named_after_its_stage() {
    let plan = vec![fault(2, 1, FaultSite::Golden(1), 3, 4)];
    let mut engine = IterationEngine::new(
        MaskKernel::new(8),
        config(LoopCount::Fixed(4), 0, 50),
        Vec::new(),
    )
    .expect("new")
    .with_faults(ScriptedInjector::new(plan));
    let report = engine.run().expect("run");

    assert_eq!(report.measured.golden_inconsistencies(), 1, "case=counted");
    assert_eq!(report.measured.total_errors(), 0, "case=not_a_data_error");
    assert!(
        engine.goldens().iter().all(|golden| golden.is_consistent()),
        "case=all_goldens_sealed"
    );
    let log = String::from_utf8(engine.into_sink()).expect("utf-8");
    assert!(log.contains(" - i: 2\n   G_D: {"), "case=g_d_field log={log}");
}

#[test]
fn input_corruption_is_caught_next_iteration_and_replayed_away() {
    let plan = vec![fault(3, 1, FaultSite::Input, 5, 9)];
    let mut engine = IterationEngine::new(
        MaskKernel::new(8),
        config(LoopCount::Fixed(6), 0, 50),
        Vec::new(),
    )
    .expect("new")
    .with_faults(ScriptedInjector::new(plan));
    let report = engine.run().expect("run");

    // Stage E of iteration 4 computes from the flipped input. The replay
    // before iteration 5 rebuilds it from the same seed.
    assert_eq!(report.measured.total_errors(), 1, "case=one_error");
    assert_eq!(report.replays, 1, "case=one_replay");
    let generated = &engine.kernel().generated;
    assert_eq!(
        generated.last(),
        generated.get(generated.len().saturating_sub(2)),
        "case=replay_reuses_seed generated={generated:?}"
    );
}

#[test]
fn unbounded_loop_can_be_driven_and_finished_by_hand() {
    let mut markers = RecordingMarkers::default();
    let mut engine = IterationEngine::new(
        MaskKernel::new(4),
        config(LoopCount::Unbounded, 1, 10),
        Vec::new(),
    )
    .expect("new")
    .with_markers(&mut markers);
    engine.init().expect("init");
    engine.warm_up().expect("warm_up");
    for _ in 0..25 {
        engine.step().expect("step");
    }
    assert_eq!(engine.phase(), EnginePhase::Running, "case=running");
    let report = engine.finish().expect("finish");
    assert_eq!(report.measured.iterations(), 25, "case=iterations");
    assert_eq!(report.phase, EnginePhase::Done, "case=done");
    drop(engine);
    // Stepping by hand bypasses the markers.
    assert!(markers.events.is_empty(), "case=no_markers");
}

#[test]
fn random_flips_never_leave_the_candidate_dirty() {
    let injector = BitFlipInjector::new(0xfeed, 0.4);
    let mut markers = RecordingMarkers::default();
    let mut engine = IterationEngine::new(
        MaskKernel::new(32),
        config(LoopCount::Fixed(200), 2, 25),
        Vec::new(),
    )
    .expect("new")
    .with_markers(&mut markers)
    .with_faults(injector);
    let report = engine.run().expect("run");

    assert!(!engine.faults().injected().is_empty(), "case=faults_fired");
    assert_eq!(
        engine.candidate(),
        engine.goldens()[1].words(),
        "case=candidate_matches_last_golden"
    );
    assert!(
        report.measured.affected_iterations() <= report.measured.iterations(),
        "case=affected_bounded"
    );
    assert!(
        report.measured.affected_iterations() <= report.measured.total_errors(),
        "case=affected_implies_errors"
    );
    drop(engine);
    assert_eq!(
        markers.events,
        vec![
            MarkerEvent::Start { iteration: 2 },
            MarkerEvent::End { iteration: 202 }
        ],
        "case=markers"
    );
}

#[test]
fn log_ends_with_sentinel_after_last_record() {
    let plan = vec![fault(2, 1, FaultSite::Output, 1, 1)];
    let mut engine = IterationEngine::new(
        MaskKernel::new(4),
        config(LoopCount::Fixed(3), 0, 50),
        Vec::new(),
    )
    .expect("new")
    .with_faults(ScriptedInjector::new(plan));
    engine.run().expect("run");
    let log = String::from_utf8(engine.into_sink()).expect("utf-8");
    let tail = log.rsplit(" - i: 2\n").next().expect("tail");
    assert!(tail.ends_with(TERMINAL_SENTINEL), "case=sentinel_last tail={tail}");
}

#[test]
fn fresh_seed_is_the_counter_of_the_deciding_iteration() {
    let mut engine = IterationEngine::new(
        MaskKernel::new(8),
        config(LoopCount::Fixed(7), 0, 3),
        Vec::new(),
    )
    .expect("new");
    let report = engine.run().expect("run");
    // Iterations 0 and 3 decide a reseed; 1 and 4 rebuild from 0 and 3.
    assert_eq!(engine.kernel().generated, vec![0, 0, 3], "case=seeds");
    assert_eq!(report.final_seed, 3, "case=final_seed");

    let mut engine = IterationEngine::new(
        MaskKernel::new(8),
        config(LoopCount::Fixed(5), 1, 2),
        Vec::new(),
    )
    .expect("new");
    engine.run().expect("run");
    // Warm-up iteration 0 counts toward the cadence like any other.
    assert_eq!(engine.kernel().generated, vec![0, 0, 2, 4], "case=seeds_with_warmup");
}

#[test]
fn non_finite_injection_probability_disables_injection() {
    for probability in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let injector = BitFlipInjector::new(1, probability);
        assert_eq!(injector.probability(), 0.0, "case=sanitized p={probability}");
        let mut engine = IterationEngine::new(
            MaskKernel::new(8),
            config(LoopCount::Fixed(20), 0, 5),
            Vec::new(),
        )
        .expect("new")
        .with_faults(injector);
        let report = engine.run().expect("run");
        assert!(report.clean(), "case=clean p={probability}");
        assert!(engine.faults().injected().is_empty(), "case=nothing_injected p={probability}");
    }
    assert_eq!(BitFlipInjector::new(1, 3.5).probability(), 1.0, "case=clamped_high");
}

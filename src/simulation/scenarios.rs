//! End-to-end runs of the step loop under each policy combination

use super::*;
use crate::config::{ArrivalPattern, Config, LengthDistribution, SchedulerConfig, WorkloadConfig};
use crate::request::{ArrivalRecord, RequestId, RequestStatus, RequestTrace, WorkloadGenerator};
use crate::scheduler::{AdmissionStrategy, PreemptionMode};
use proptest::prelude::*;
use std::collections::HashSet;

fn policy(mode: PreemptionMode, strategy: AdmissionStrategy, allow_waiting_preempt: bool) -> SchedulerConfig {
    SchedulerConfig {
        preemption_mode: mode,
        preemption_strategy: strategy,
        allow_waiting_preempt,
    }
}

fn all_policies() -> Vec<SchedulerConfig> {
    let mut policies = Vec::new();
    for mode in [PreemptionMode::Swap, PreemptionMode::Sacrifice] {
        for strategy in [AdmissionStrategy::Conservative, AdmissionStrategy::Aggressive] {
            for allow in [false, true] {
                policies.push(policy(mode, strategy, allow));
            }
        }
    }
    policies
}

/// M_total = 100, unlimited budget, one time unit per step
fn create_test_config(scheduler: SchedulerConfig) -> Config {
    Config {
        scheduler,
        ..Config::test_default()
    }
}

fn records(specs: &[(f64, u64, u64)]) -> Vec<ArrivalRecord> {
    specs
        .iter()
        .map(|&(time, prefill, decode)| ArrivalRecord::new(time, prefill, decode))
        .collect()
}

fn run(config: Config, specs: &[(f64, u64, u64)]) -> (RunReport, RecordingSink) {
    let mut sim = Simulator::new(config, records(specs), RecordingSink::new()).unwrap();
    let report = sim.run();
    (report, sim.into_sink())
}

fn trace(report: &RunReport, id: RequestId) -> &RequestTrace {
    report.traces.iter().find(|t| t.req_id == id).unwrap()
}

fn event_names(sink: &RecordingSink, id: RequestId) -> Vec<&'static str> {
    sink.events_for(id).map(|e| e.kind.name()).collect()
}

#[test]
fn test_swap_eviction_resumes_from_saved_position() {
    let config = create_test_config(policy(
        PreemptionMode::Swap,
        AdmissionStrategy::Aggressive,
        true,
    ));
    let (report, sink) = run(config, &[(0.0, 60, 5), (1.5, 50, 3)]);

    assert_eq!(
        event_names(&sink, 0),
        vec!["arrival", "admission", "swap_out", "swap_in", "completion"]
    );

    let swap_out = sink.events_for(0).find(|e| e.kind.name() == "swap_out").unwrap();
    assert_eq!(swap_out.time, 2.0);
    assert_eq!(
        swap_out.kind,
        EventKind::SwapOut {
            decode_position: 2,
            memory_freed: 62
        }
    );

    // The returning request does not displace the newcomer; it resumes once
    // the newcomer completes
    let swap_in = sink.events_for(0).find(|e| e.kind.name() == "swap_in").unwrap();
    assert_eq!(swap_in.time, 5.0);
    assert_eq!(swap_in.kind, EventKind::SwapIn { decode_position: 2 });

    let step = &sink.steps[2];
    assert_eq!(step.time, 2.0);
    assert_eq!(step.swapped_out, 1);
    assert_eq!(step.swapped_count, 1);
    assert_eq!(step.running_count, 1);
    assert_eq!(step.gpu_memory_used, 50);

    let first = trace(&report, 0);
    assert_eq!(first.swap_count, 1);
    assert_eq!(first.executed_steps, 5);
    assert_eq!(first.total_swapped_time, 3.0);
    assert_eq!(first.completion_time, Some(8.0));

    let second = trace(&report, 1);
    assert_eq!(second.swap_count, 0);
    assert_eq!(second.completion_time, Some(5.0));
    assert_eq!(report.summary.total_swaps, 1);
}

#[test]
fn test_conservative_newcomer_waits_for_memory() {
    let config = create_test_config(policy(
        PreemptionMode::Swap,
        AdmissionStrategy::Conservative,
        true,
    ));
    let (report, sink) = run(config, &[(0.0, 60, 5), (1.5, 50, 3)]);

    assert!(sink.events.iter().all(|e| e.kind.name() != "swap_out"));
    assert_eq!(trace(&report, 0).completion_time, Some(5.0));

    let second = trace(&report, 1);
    assert_eq!(second.waiting_time, Some(3.5));
    assert_eq!(second.completion_time, Some(8.0));
    assert_eq!(report.summary.total_swaps, 0);
}

#[test]
fn test_sacrifice_resets_progress_and_requeues_at_head() {
    let config = create_test_config(policy(
        PreemptionMode::Sacrifice,
        AdmissionStrategy::Conservative,
        false,
    ));
    let mut sim =
        Simulator::new(config, records(&[(0.0, 45, 10), (0.5, 50, 10)]), RecordingSink::new())
            .unwrap();

    // Growth overshoots memory at t=4 and the newest request is sacrificed
    for _ in 0..5 {
        assert!(sim.step());
    }
    let head = &sim.state().waiting()[0];
    assert_eq!(head.id, 1);
    assert_eq!(head.status, RequestStatus::Waiting);
    assert_eq!(head.decode_position, 0);
    assert_eq!(head.sacrifice_count, 1);

    let report = sim.run();
    let sink = sim.into_sink();

    let sacrifices: Vec<(f64, u64)> = sink
        .events_for(1)
        .filter_map(|e| match e.kind {
            EventKind::Sacrifice {
                decode_position, ..
            } => Some((e.time, decode_position)),
            _ => None,
        })
        .collect();
    assert_eq!(sacrifices, vec![(4.0, 3), (6.0, 1)]);

    let victim = trace(&report, 1);
    assert_eq!(victim.sacrifice_count as usize, sacrifices.len());
    assert_eq!(victim.wasted_positions, 4);
    assert_eq!(victim.executed_steps, victim.decode_length + victim.wasted_positions);
    assert_eq!(victim.executed_steps, 14);
    assert_eq!(victim.completion_time, Some(20.0));

    assert_eq!(trace(&report, 0).completion_time, Some(10.0));
    assert_eq!(report.summary.wasted_tokens, 4);
    assert_eq!(report.summary.total_sacrifices, 2);
}

#[test]
fn test_sacrificed_senior_restarts_after_newcomer() {
    let config = create_test_config(policy(
        PreemptionMode::Sacrifice,
        AdmissionStrategy::Aggressive,
        false,
    ));
    let (report, sink) = run(config, &[(0.0, 60, 5), (1.5, 50, 3)]);

    assert_eq!(
        event_names(&sink, 0),
        vec!["arrival", "admission", "sacrifice", "admission", "completion"]
    );

    let first = trace(&report, 0);
    assert_eq!(first.sacrifice_count, 1);
    assert_eq!(first.wasted_positions, 2);
    assert_eq!(first.executed_steps, 7);
    assert_eq!(first.completion_time, Some(10.0));
    assert_eq!(trace(&report, 1).completion_time, Some(5.0));
}

#[test]
fn test_lifo_evicts_most_recent_entrant() {
    let config = create_test_config(policy(
        PreemptionMode::Swap,
        AdmissionStrategy::Conservative,
        false,
    ));
    let (report, sink) = run(config, &[(0.0, 30, 20), (0.5, 30, 20), (1.5, 30, 20)]);

    let first_eviction = sink
        .events
        .iter()
        .find(|e| matches!(e.kind, EventKind::SwapOut { .. }))
        .unwrap();
    assert_eq!(first_eviction.req_id, 2);
    assert_eq!(first_eviction.time, 5.0);
    assert_eq!(
        first_eviction.kind,
        EventKind::SwapOut {
            decode_position: 3,
            memory_freed: 33
        }
    );

    assert_eq!(report.stop_reason, Some(StopReason::Drained));
    assert_eq!(report.traces.len(), 3);
    assert_eq!(trace(&report, 0).swap_count, 0);
}

#[test]
fn test_every_policy_drains_contended_workload() {
    let specs = [
        (0.0, 40, 25),
        (0.2, 35, 30),
        (0.4, 30, 20),
        (0.6, 45, 15),
        (0.8, 25, 35),
    ];

    for scheduler in all_policies() {
        let mode = scheduler.preemption_mode;
        let (report, sink) = run(create_test_config(scheduler.clone()), &specs);

        assert_eq!(report.stop_reason, Some(StopReason::Drained), "{:?}", scheduler);
        assert_eq!(report.traces.len(), specs.len(), "{:?}", scheduler);
        assert!(report.total_batches < 2_000, "{:?}", scheduler);
        assert!(sink.steps.iter().all(|s| s.gpu_memory_used <= 100));

        for t in &report.traces {
            assert_eq!(t.executed_steps, t.decode_length + t.wasted_positions);
            match mode {
                PreemptionMode::Swap => assert_eq!(t.sacrifice_count, 0),
                PreemptionMode::Sacrifice => assert_eq!(t.swap_count, 0),
            }
        }
    }
}

#[test]
fn test_runs_are_deterministic() {
    let workload = WorkloadConfig {
        arrival_pattern: ArrivalPattern::Poisson,
        arrival_rate: 0.8,
        num_requests: 60,
        prefill_len_dist: LengthDistribution::Uniform { min: 10, max: 50 },
        decode_len_dist: LengthDistribution::Uniform { min: 1, max: 40 },
        seed: 7,
    };
    let arrivals = WorkloadGenerator::new(workload).unwrap().generate();

    for scheduler in all_policies() {
        let render = || {
            let config = create_test_config(scheduler.clone());
            let mut sim = Simulator::new(config, arrivals.clone(), RecordingSink::new()).unwrap();
            let report = sim.run();
            let sink = sim.into_sink();
            assert!(sink.steps.iter().all(|s| s.gpu_memory_used <= 100));
            (
                serde_json::to_string(&sink.steps).unwrap(),
                serde_json::to_string(&sink.events).unwrap(),
                serde_json::to_string(&report.traces).unwrap(),
            )
        };
        assert_eq!(render(), render());
    }
}

fn check_invariants(sim: &Simulator<RecordingSink>) -> Result<(), TestCaseError> {
    let state = sim.state();

    // Every ingested request is in exactly one place
    prop_assert_eq!(
        state.live_count() as u64 + state.completed_count(),
        sim.ingested()
    );
    let ids: HashSet<RequestId> = state
        .waiting()
        .iter()
        .chain(state.running())
        .chain(state.swapped())
        .map(|r| r.id)
        .collect();
    prop_assert_eq!(ids.len(), state.live_count());

    for r in state.running() {
        prop_assert_eq!(r.status, RequestStatus::Running);
        prop_assert!(r.decode_position < r.decode_length);
    }
    for r in state.waiting() {
        prop_assert_eq!(r.status, RequestStatus::Waiting);
    }
    for r in state.swapped() {
        prop_assert_eq!(r.status, RequestStatus::Swapped);
        prop_assert!(r.decode_position < r.decode_length);
    }
    Ok(())
}

fn workload_strategy() -> impl Strategy<Value = Vec<(f64, u64, u64)>> {
    prop::collection::vec((0u8..4, 1u64..60, 1u64..30), 1..20).prop_map(|raw| {
        let mut time = 0.0;
        raw.into_iter()
            .map(|(gap, prefill, decode)| {
                time += gap as f64 * 0.5;
                (time, prefill, decode)
            })
            .collect()
    })
}

fn policy_strategy() -> impl Strategy<Value = SchedulerConfig> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(sacrifice, aggressive, allow)| {
        policy(
            if sacrifice {
                PreemptionMode::Sacrifice
            } else {
                PreemptionMode::Swap
            },
            if aggressive {
                AdmissionStrategy::Aggressive
            } else {
                AdmissionStrategy::Conservative
            },
            allow,
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_random_workloads_respect_memory_and_drain(
        specs in workload_strategy(),
        scheduler in policy_strategy(),
        budget in 20u64..200
    ) {
        let mut config = create_test_config(scheduler);
        config.system.token_budget = budget;
        let mut sim = Simulator::new(config, records(&specs), RecordingSink::new()).unwrap();

        let mut steps = 0;
        while sim.step() {
            check_invariants(&sim)?;
            steps += 1;
            prop_assert!(steps < 20_000, "simulation did not terminate");
        }

        prop_assert_eq!(sim.stop_reason(), Some(StopReason::Drained));
        for step in &sim.sink().steps {
            prop_assert!(step.gpu_memory_used <= 100);
            prop_assert!(step.batch_count >= 1);
        }

        let report = sim.report();
        prop_assert_eq!(report.traces.len(), specs.len());
        for t in &report.traces {
            prop_assert_eq!(t.executed_steps, t.decode_length + t.wasted_positions);
        }
    }
}

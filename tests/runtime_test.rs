//! The threaded runtime against the lockstep simulation.

use schedsim::prelude::*;
use std::time::Duration;

fn policies() -> [SchedulingPolicy; 4] {
    [
        SchedulingPolicy::HighestPriorityFirst,
        SchedulingPolicy::ShortestRemainingTimeNext,
        SchedulingPolicy::RoundRobin { quantum: 1 },
        SchedulingPolicy::RoundRobin { quantum: 4 },
    ]
}

#[test]
fn test_runtime_matches_simulation() {
    let workload = Workload::generate(12, 42, 1024).unwrap();

    for policy in policies() {
        let config = Config::builder().policy(policy).build().unwrap();
        let expected = Simulation::new(config.clone()).unwrap().run(&workload).unwrap();
        let actual = Runtime::new(config).unwrap().run(workload.clone()).unwrap();

        assert_eq!(actual.events, expected.events, "event logs differ under {}", policy);
        assert_eq!(actual.summary, expected.summary, "summaries differ under {}", policy);
    }
}

#[test]
fn test_runtime_srtn_preemption() {
    let workload = Workload::new(vec![
        ProcessSpec::new(1, 0, 14, 0, 10),
        ProcessSpec::new(2, 4, 4, 0, 10),
    ])
    .unwrap();
    let config = Config::builder()
        .policy(SchedulingPolicy::ShortestRemainingTimeNext)
        .build()
        .unwrap();
    let report = Runtime::new(config).unwrap().run(workload).unwrap();

    let lines: Vec<String> = report
        .events
        .process_events()
        .iter()
        .map(|e| e.to_string())
        .collect();
    assert_eq!(lines[1], "At time 4 process 1 stopped arr 0 total 14 remain 10 wait 0");
    assert_eq!(lines[2], "At time 4 process 2 started arr 4 total 4 remain 4 wait 0");
    assert!(lines[5].starts_with("At time 18 process 1 finished"));
}

#[test]
fn test_runtime_with_paced_clock() {
    let workload = Workload::new(vec![
        ProcessSpec::new(1, 0, 3, 1, 64),
        ProcessSpec::new(2, 1, 2, 0, 64),
    ])
    .unwrap();
    let config = Config::builder()
        .tick_interval(Duration::from_millis(2))
        .build()
        .unwrap();
    let report = Runtime::new(config).unwrap().run(workload).unwrap();

    assert_eq!(report.summary.finished, 2);
    assert_eq!(report.summary.total_ticks, 5);
}

#[test]
fn test_runtime_empty_workload() {
    let report = Runtime::new(Config::default())
        .unwrap()
        .run(Workload::default())
        .unwrap();
    assert_eq!(report.summary.finished, 0);
    assert_eq!(report.summary.total_ticks, 0);
}

#[test]
fn test_runtime_rejects_invalid_config() {
    let mut config = Config::default();
    config.arena_size = 1000;
    assert!(matches!(Runtime::new(config), Err(Error::Config(_))));
}

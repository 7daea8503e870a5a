use schedsim::executor::SimulatedExecutor;
use schedsim::prelude::*;
use schedsim::telemetry::{MemoryEventKind, ProcessEvent, ProcessEventKind};

fn simulate(policy: SchedulingPolicy, processes: Vec<ProcessSpec>) -> SimulationReport {
    let config = Config::builder().policy(policy).build().unwrap();
    let workload = Workload::new(processes).unwrap();
    Simulation::new(config).unwrap().run(&workload).unwrap()
}

fn dispatches(report: &SimulationReport) -> Vec<(Tick, u32)> {
    report
        .events
        .process_events()
        .iter()
        .filter(|e| matches!(e.kind, ProcessEventKind::Started | ProcessEventKind::Resumed))
        .map(|e| (e.tick, e.process.0))
        .collect()
}

fn finished(report: &SimulationReport, id: u32) -> ProcessEvent {
    report
        .events
        .events_for(ProcessId(id))
        .find(|e| e.kind == ProcessEventKind::Finished)
        .cloned()
        .unwrap()
}

#[test]
fn test_hpf_runs_lowest_value_first() {
    let report = simulate(
        SchedulingPolicy::HighestPriorityFirst,
        vec![
            ProcessSpec::new(1, 0, 3, 3, 10),
            ProcessSpec::new(2, 0, 3, 1, 10),
            ProcessSpec::new(3, 0, 3, 2, 10),
            // more urgent than anything, but arrives while 2 is running
            ProcessSpec::new(4, 1, 3, 0, 10),
        ],
    );

    assert_eq!(dispatches(&report), vec![(0, 2), (3, 4), (6, 3), (9, 1)]);
    assert!(report
        .events
        .process_events()
        .iter()
        .all(|e| e.kind != ProcessEventKind::Stopped));
}

#[test]
fn test_srtn_preempts_for_shorter_arrival() {
    let report = simulate(
        SchedulingPolicy::ShortestRemainingTimeNext,
        vec![
            ProcessSpec::new(1, 0, 14, 0, 10),
            ProcessSpec::new(2, 4, 4, 0, 10),
        ],
    );

    let p1: Vec<String> = report
        .events
        .events_for(ProcessId(1))
        .map(|e| e.to_string())
        .collect();
    assert_eq!(
        p1,
        vec![
            "At time 0 process 1 started arr 0 total 14 remain 14 wait 0",
            "At time 4 process 1 stopped arr 0 total 14 remain 10 wait 0",
            "At time 8 process 1 resumed arr 0 total 14 remain 10 wait 4",
            "At time 18 process 1 finished arr 0 total 14 remain 0 wait 4 TA 18 WTA 1.29",
        ]
    );

    let p2 = finished(&report, 2);
    assert_eq!(p2.tick, 8);
    assert_eq!(p2.waiting, 0);
}

#[test]
fn test_round_robin_slices() {
    let report = simulate(
        SchedulingPolicy::RoundRobin { quantum: 2 },
        vec![
            ProcessSpec::new(1, 0, 5, 0, 10),
            ProcessSpec::new(2, 0, 5, 0, 10),
            ProcessSpec::new(3, 0, 5, 0, 10),
        ],
    );

    let order: Vec<u32> = dispatches(&report).into_iter().map(|(_, id)| id).collect();
    assert_eq!(order, vec![1, 2, 3, 1, 2, 3, 1, 2, 3]);

    for (id, finish) in [(1, 13), (2, 14), (3, 15)] {
        let slices = report
            .events
            .events_for(ProcessId(id))
            .filter(|e| matches!(e.kind, ProcessEventKind::Started | ProcessEventKind::Resumed))
            .count();
        assert_eq!(slices, 3);
        assert_eq!(finished(&report, id).tick, finish);
    }
}

#[test]
fn test_single_process_metrics() {
    let report = simulate(
        SchedulingPolicy::HighestPriorityFirst,
        vec![ProcessSpec::new(1, 0, 5, 0, 100)],
    );

    let done = finished(&report, 1);
    assert_eq!(done.tick, 5);
    assert_eq!(done.waiting, 0);
    let completion = done.completion.unwrap();
    assert_eq!(completion.turnaround, 5);
    assert!((completion.weighted_turnaround - 1.0).abs() < 1e-9);

    assert!((report.summary.cpu_utilization - 100.0).abs() < 1e-9);
    assert!((report.summary.mean_wta - 1.0).abs() < 1e-9);
    assert_eq!(report.summary.std_wta, 0.0);
}

#[test]
fn test_idle_ticks_lower_utilization() {
    let report = simulate(
        SchedulingPolicy::HighestPriorityFirst,
        vec![ProcessSpec::new(1, 2, 2, 0, 100)],
    );
    assert_eq!(report.summary.idle_ticks, 2);
    assert_eq!(report.summary.busy_ticks, 2);
    assert!((report.summary.cpu_utilization - 50.0).abs() < 1e-9);
}

#[test]
fn test_memory_rejection_drops_arrival() {
    let config = Config::builder()
        .arena_size(256)
        .policy(SchedulingPolicy::HighestPriorityFirst)
        .build()
        .unwrap();
    let workload = Workload::new(vec![
        ProcessSpec::new(1, 0, 5, 0, 200),
        ProcessSpec::new(2, 1, 5, 0, 10),
        ProcessSpec::new(3, 6, 2, 0, 10),
    ])
    .unwrap();
    let report = Simulation::new(config).unwrap().run(&workload).unwrap();

    assert_eq!(report.summary.finished, 2);
    assert_eq!(report.summary.rejected, 1);
    assert_eq!(report.events.events_for(ProcessId(2)).count(), 0);

    let memory: Vec<String> = report
        .events
        .memory_events()
        .iter()
        .map(|e| e.to_string())
        .collect();
    assert_eq!(
        memory,
        vec![
            "At time 0 allocated 256 bytes for process 1 from 0 to 255",
            "At time 1 couldn't allocate 10 bytes for process 2",
            "At time 5 freed 256 bytes for process 1 from 0 to 255",
            "At time 6 allocated 16 bytes for process 3 from 0 to 15",
            "At time 8 freed 16 bytes for process 3 from 0 to 15",
        ]
    );
}

#[test]
fn test_waiting_equals_turnaround_minus_service() {
    let workload = Workload::generate(40, 11, 1024).unwrap();
    for policy in [
        SchedulingPolicy::HighestPriorityFirst,
        SchedulingPolicy::ShortestRemainingTimeNext,
        SchedulingPolicy::RoundRobin { quantum: 3 },
    ] {
        let config = Config::builder().policy(policy).build().unwrap();
        let report = Simulation::new(config).unwrap().run(&workload).unwrap();

        assert_eq!(
            report.summary.finished + report.summary.rejected,
            workload.len() as u64
        );
        for event in report.events.process_events() {
            if let Some(done) = event.completion {
                assert_eq!(done.turnaround, event.waiting + event.total);
            }
        }
    }
}

#[test]
fn test_teardown_leaves_nothing_behind() {
    let config = Config::builder()
        .policy(SchedulingPolicy::RoundRobin { quantum: 1 })
        .build()
        .unwrap();
    let workload = Workload::generate(12, 3, 1024).unwrap();
    let mut sched = Scheduler::new(&config, SimulatedExecutor::new(), workload.len()).unwrap();

    let mut pending = workload.processes().iter().peekable();
    let mut tick = 0;
    loop {
        for report in sched.executor_mut().advance(tick) {
            sched.on_report(report).unwrap();
        }
        while let Some(spec) = pending.next_if(|p| p.arrival_time <= tick) {
            sched.admit(tick, spec).unwrap();
        }
        if sched.is_done() {
            break;
        }
        sched.run_tick(tick).unwrap();
        tick += 1;
    }

    assert!(sched.memory().is_empty());
    assert_eq!(sched.memory().node_count(), 0);
    assert_eq!(sched.ready_len(), 0);
    assert_eq!(sched.processes().count(), 0);
    assert!(sched.running().is_none());
    assert_eq!(sched.executor().live_units(), 0);
}

#[test]
fn test_rejections_are_logged_as_memory_events() {
    let config = Config::builder().arena_size(64).build().unwrap();
    let workload = Workload::new(vec![ProcessSpec::new(1, 0, 1, 0, 65)]).unwrap();
    let report = Simulation::new(config).unwrap().run(&workload).unwrap();

    assert_eq!(report.summary.finished, 0);
    assert_eq!(report.events.memory_events()[0].kind, MemoryEventKind::Rejected);
    assert!(report.events.process_events().is_empty());
}

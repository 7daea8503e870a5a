//! Single-threaded lockstep driver.
//!
//! Runs the scheduler core against [`SimulatedExecutor`] units on the
//! caller's thread, one tick per loop iteration. Given the same workload and
//! configuration it produces the same report as [`crate::Runtime`], without
//! spawning anything.

use crate::config::Config;
use crate::error::Result;
use crate::executor::SimulatedExecutor;
use crate::scheduler::Scheduler;
use crate::telemetry::SimulationReport;
use crate::workload::Workload;
use crate::Tick;

#[derive(Debug, Clone)]
pub struct Simulation {
    config: Config,
}

impl Simulation {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn run(&self, workload: &Workload) -> Result<SimulationReport> {
        log::info!(
            "simulating {} processes under {}",
            workload.len(),
            self.config.policy
        );

        let mut sched = Scheduler::new(&self.config, SimulatedExecutor::new(), workload.len())?;
        let mut pending = workload.processes().iter().peekable();
        let mut tick: Tick = 0;

        loop {
            for report in sched.executor_mut().advance(tick) {
                sched.on_report(report)?;
            }

            while let Some(spec) = pending.next_if(|p| p.arrival_time <= tick) {
                sched.admit(tick, spec)?;
            }

            if sched.is_done() {
                break;
            }

            sched.run_tick(tick)?;
            tick += 1;
        }

        log::info!("simulation finished at tick {}", tick);
        Ok(sched.into_report())
    }
}

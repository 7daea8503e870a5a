//! Threaded driver: clock, generator and execution units on their own
//! threads, the scheduler core on the caller's.

use crate::clock::{Clock, ClockDriver};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::ThreadedExecutor;
use crate::generator::Generator;
use crate::protocol::{GeneratorMessage, UnitReport};
use crate::scheduler::Scheduler;
use crate::telemetry::SimulationReport;
use crate::workload::Workload;
use crate::Tick;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Runtime {
    config: Config,
}

impl Runtime {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `workload` to completion. Every thread started here is stopped
    /// and joined before returning, on success and on error alike.
    pub fn run(&self, workload: Workload) -> Result<SimulationReport> {
        log::info!(
            "running {} processes under {}",
            workload.len(),
            self.config.policy
        );

        let clock = Arc::new(Clock::new());
        let (arrival_tx, arrival_rx) = unbounded();
        let (report_tx, report_rx) = unbounded();

        let executor = ThreadedExecutor::new(
            clock.clone(),
            report_tx,
            self.config.unit_name_prefix.clone(),
            self.config.stall_timeout,
        );
        let mut sched = Scheduler::new(&self.config, executor, workload.len())?;

        let generator = Generator::start(workload, clock.clone(), arrival_tx)?;
        let mut driver = ClockDriver::start(clock.clone(), self.config.tick_interval)?;

        let channels = CoreChannels {
            arrivals: arrival_rx,
            reports: report_rx,
            timeout: self.config.stall_timeout,
        };
        let outcome = drive(&mut sched, &clock, &channels);

        driver.stop();
        let generated = generator.join();
        let report = sched.into_report();

        outcome?;
        generated?;
        log::info!("run finished after {} ticks", report.summary.total_ticks);
        Ok(report)
    }
}

struct CoreChannels {
    arrivals: Receiver<GeneratorMessage>,
    reports: Receiver<UnitReport>,
    timeout: Duration,
}

impl CoreChannels {
    fn recv<T>(&self, rx: &Receiver<T>, what: &str) -> Result<T> {
        rx.recv_timeout(self.timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => {
                Error::channel(format!("no {} within {:?}", what, self.timeout))
            }
            RecvTimeoutError::Disconnected => Error::channel(format!("{} channel closed", what)),
        })
    }
}

// per-tick loop
fn drive(
    sched: &mut Scheduler<ThreadedExecutor>,
    clock: &Clock,
    channels: &CoreChannels,
) -> Result<()> {
    let mut tick: Tick = clock.now();
    let mut generator_open = true;

    loop {
        if sched.running().is_some() {
            let report = channels.recv(&channels.reports, "unit report")?;
            if report.tick() != tick {
                return Err(Error::protocol(format!(
                    "report for tick {} received at tick {}",
                    report.tick(),
                    tick
                )));
            }
            sched.on_report(report)?;
        }

        while generator_open {
            match channels.recv(&channels.arrivals, "arrival batch")? {
                GeneratorMessage::Arrival(spec) => {
                    sched.admit(tick, &spec)?;
                }
                GeneratorMessage::BatchComplete(done) if done == tick => break,
                GeneratorMessage::BatchComplete(done) => {
                    return Err(Error::protocol(format!(
                        "batch for tick {} received at tick {}",
                        done, tick
                    )));
                }
                GeneratorMessage::Exhausted => generator_open = false,
            }
        }

        if sched.is_done() {
            return Ok(());
        }

        sched.run_tick(tick)?;
        clock.settle(tick);

        let next = clock
            .wait_past(tick)
            .ok_or_else(|| Error::channel("clock stopped"))?;
        if next != tick + 1 {
            return Err(Error::protocol(format!(
                "clock jumped from {} to {}",
                tick, next
            )));
        }
        tick = next;
    }
}

//! Scheduler core: admission, dispatch and retirement.
//!
//! [`Scheduler`] owns the buddy allocator, the active ready structure and the
//! PCB table, and drives execution units through an [`Executor`]. A driver
//! (see [`crate::Simulation`] and [`crate::Runtime`]) feeds it one tick at a
//! time in a fixed order:
//!
//! 1. the running unit's report for the tick ([`Scheduler::on_report`]),
//! 2. every arrival due at the tick ([`Scheduler::admit`]),
//! 3. one dispatch decision ([`Scheduler::run_tick`]).
//!
//! Finishing before admitting means a freed block can satisfy an arrival in
//! the same tick; admitting before dispatching means a new arrival can
//! preempt immediately.

pub mod fifo;
pub mod hpf;
pub mod priority;
pub mod ready;
pub mod round_robin;
pub mod srtn;

pub use fifo::FifoQueue;
pub use priority::PriorityHeap;
pub use ready::ReadyQueue;

use crate::config::{Config, SchedulingPolicy};
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::memory::{BlockRange, BuddyAllocator};
use crate::process::{Pcb, PcbRef, PcbTable, ProcessId, ProcessState};
use crate::protocol::UnitReport;
use crate::telemetry::{
    Completion, EventLog, MemoryEvent, MemoryEventKind, Metrics, PerformanceSummary, ProcessEvent,
    ProcessEventKind, SimulationReport,
};
use crate::workload::ProcessSpec;
use crate::Tick;

/// Outcome of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted { id: ProcessId, block: BlockRange },
    /// No fitting memory block; the arrival was dropped.
    Rejected { id: ProcessId },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

#[derive(Debug)]
pub struct Scheduler<E: Executor> {
    policy: SchedulingPolicy,
    memory: BuddyAllocator,
    ready: ReadyQueue,
    table: PcbTable,
    running: Option<PcbRef>,
    quantum_remaining: u64,
    outstanding: usize,
    executor: E,
    metrics: Metrics,
    events: EventLog,
}

impl<E: Executor> Scheduler<E> {
    /// Build a scheduler expecting `expected` arrivals in total.
    pub fn new(config: &Config, executor: E, expected: usize) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            policy: config.policy,
            memory: BuddyAllocator::new(config.arena_size)?,
            ready: ReadyQueue::for_policy(config.policy, config.ready_capacity),
            table: PcbTable::new(),
            running: None,
            quantum_remaining: 0,
            outstanding: expected,
            executor,
            metrics: Metrics::new(),
            events: EventLog::new(),
        })
    }

    /// Reserve memory for an arrival and queue it.
    ///
    /// A request the allocator cannot satisfy is logged and dropped, and the
    /// number of outstanding processes shrinks by one. A full ready structure
    /// undoes the admission and surfaces [`Error::Capacity`]. A zero run time
    /// is refused with [`Error::Workload`], since its unit would never finish.
    pub fn admit(&mut self, tick: Tick, spec: &ProcessSpec) -> Result<Admission> {
        if spec.run_time == 0 {
            return Err(Error::workload(format!(
                "process {} has zero run time",
                spec.id
            )));
        }

        let block = match self.memory.allocate(spec.mem_size) {
            Some(block) => block,
            None => {
                self.events.record_memory(MemoryEvent {
                    tick,
                    process: spec.id,
                    kind: MemoryEventKind::Rejected,
                    size: spec.mem_size,
                    range: None,
                });
                self.metrics.record_rejection();
                self.outstanding = self.outstanding.saturating_sub(1);
                return Ok(Admission::Rejected { id: spec.id });
            }
        };

        let pcb = Pcb::admit(spec, block);
        let key = ready_key(self.policy, &pcb);
        let slot = self.table.insert(pcb);

        if let Err(e) = self.ready.insert(key, slot) {
            self.table.remove(slot);
            self.memory.deallocate(block)?;
            return Err(e);
        }

        self.events.record_memory(MemoryEvent {
            tick,
            process: spec.id,
            kind: MemoryEventKind::Allocated,
            size: block.size(),
            range: Some(block.range()),
        });

        Ok(Admission::Admitted {
            id: spec.id,
            block: block.range(),
        })
    }

    /// Handle the running unit's report for a tick.
    pub fn on_report(&mut self, report: UnitReport) -> Result<()> {
        let slot = self
            .running
            .ok_or_else(|| Error::protocol(format!("{:?} with no running process", report)))?;
        let pcb = self
            .table
            .get_mut(slot)
            .ok_or_else(|| Error::protocol("running slot points at a retired PCB"))?;

        if pcb.unit != Some(report.unit()) {
            return Err(Error::protocol(format!(
                "report from {} but process {} is bound to {:?}",
                report.unit(),
                pcb.id,
                pcb.unit
            )));
        }

        match report {
            UnitReport::Progress { remaining, .. } => {
                pcb.remaining_time = remaining;
                Ok(())
            }
            UnitReport::Finished { tick, .. } => self.retire(tick),
        }
    }

    /// Retire the running process: account for it, release its unit and
    /// memory block, and clear the running slot.
    pub fn retire(&mut self, tick: Tick) -> Result<()> {
        let slot = self
            .running
            .take()
            .ok_or_else(|| Error::protocol("finish with no running process"))?;
        let mut pcb = self
            .table
            .remove(slot)
            .ok_or_else(|| Error::protocol("running slot points at a retired PCB"))?;
        let unit = pcb
            .unit
            .ok_or_else(|| Error::protocol(format!("process {} was never started", pcb.id)))?;

        pcb.remaining_time = self.executor.remaining(unit)?;
        if pcb.remaining_time != 0 {
            return Err(Error::protocol(format!(
                "process {} finished with {} ticks remaining",
                pcb.id, pcb.remaining_time
            )));
        }
        self.executor.reap(unit)?;
        pcb.state = ProcessState::Finished;

        let turnaround = pcb.turnaround(tick);
        let weighted_turnaround = pcb.weighted_turnaround(tick);
        self.metrics
            .record_completion(turnaround, weighted_turnaround, pcb.waiting_time);

        let mut event = process_event(&pcb, tick, ProcessEventKind::Finished);
        event.completion = Some(Completion {
            turnaround,
            weighted_turnaround,
        });
        self.events.record_process(event);

        self.memory.deallocate(pcb.memory)?;
        self.events.record_memory(MemoryEvent {
            tick,
            process: pcb.id,
            kind: MemoryEventKind::Freed,
            size: pcb.memory.size(),
            range: Some(pcb.memory.range()),
        });

        self.outstanding = self.outstanding.saturating_sub(1);
        Ok(())
    }

    /// Make this tick's dispatch decision and count the tick.
    pub fn run_tick(&mut self, tick: Tick) -> Result<()> {
        if !self.ready.is_empty() {
            match self.policy {
                SchedulingPolicy::HighestPriorityFirst => hpf::dispatch(self, tick)?,
                SchedulingPolicy::ShortestRemainingTimeNext => srtn::dispatch(self, tick)?,
                SchedulingPolicy::RoundRobin { quantum } => {
                    round_robin::dispatch(self, tick, quantum)?
                }
            }
        }

        self.metrics.record_tick(self.running.is_some());
        Ok(())
    }

    pub fn policy(&self) -> SchedulingPolicy {
        self.policy
    }

    /// The process currently holding the CPU.
    pub fn running(&self) -> Option<&Pcb> {
        self.running.and_then(|slot| self.table.get(slot))
    }

    /// Arrivals not yet finished or rejected.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn is_done(&self) -> bool {
        self.outstanding == 0
    }

    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Live (admitted, unfinished) control blocks.
    pub fn processes(&self) -> impl Iterator<Item = &Pcb> {
        self.table.iter()
    }

    pub fn memory(&self) -> &BuddyAllocator {
        &self.memory
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn summary(&self) -> PerformanceSummary {
        self.metrics.summary()
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    /// Tear down remaining units and hand back the run's report.
    pub fn into_report(mut self) -> SimulationReport {
        self.executor.shutdown();
        SimulationReport {
            policy: self.policy,
            summary: self.metrics.summary(),
            events: self.events,
        }
    }

    // Dispatch helpers shared by the policy modules.

    pub(crate) fn take_ready(&mut self) -> Result<PcbRef> {
        self.ready
            .take_next()
            .ok_or_else(|| Error::protocol("dispatch on an empty ready structure"))
    }

    /// Read the running unit's mirror into its PCB.
    pub(crate) fn refresh_running(&mut self) -> Result<Option<u64>> {
        let slot = match self.running {
            Some(slot) => slot,
            None => return Ok(None),
        };
        let pcb = self
            .table
            .get_mut(slot)
            .ok_or_else(|| Error::protocol("running slot points at a retired PCB"))?;
        let unit = pcb
            .unit
            .ok_or_else(|| Error::protocol(format!("process {} has no unit", pcb.id)))?;

        pcb.remaining_time = self.executor.remaining(unit)?;
        Ok(Some(pcb.remaining_time))
    }

    /// Bind `slot` to the CPU: a fresh unit the first time, a resume after
    /// preemption.
    pub(crate) fn start_or_resume(&mut self, tick: Tick, slot: PcbRef) -> Result<()> {
        if self.running.is_some() {
            return Err(Error::protocol("dispatch while a process is running"));
        }
        debug_assert!(!self.ready.contains(slot), "dispatching a queued PCB");
        let pcb = self
            .table
            .get_mut(slot)
            .ok_or_else(|| Error::protocol("ready structure points at a retired PCB"))?;

        let kind = match pcb.unit {
            Some(unit) => {
                self.executor.resume(unit, tick)?;
                pcb.mark_resumed(tick);
                ProcessEventKind::Resumed
            }
            None => {
                let unit = self.executor.start(pcb.id, pcb.remaining_time, tick)?;
                pcb.mark_started(tick, unit);
                ProcessEventKind::Started
            }
        };

        self.events.record_process(process_event(pcb, tick, kind));
        self.running = Some(slot);
        Ok(())
    }

    /// Swap the running process out for the next ready one.
    ///
    /// The successor leaves the ready structure before the paused process
    /// goes back in, so a swap never needs more than the current capacity.
    /// Returns the successor, which the caller dispatches.
    pub(crate) fn preempt(&mut self, tick: Tick) -> Result<PcbRef> {
        let next = self.take_ready()?;
        let slot = self
            .running
            .take()
            .ok_or_else(|| Error::protocol("preempt with no running process"))?;
        let pcb = self
            .table
            .get_mut(slot)
            .ok_or_else(|| Error::protocol("running slot points at a retired PCB"))?;
        let unit = pcb
            .unit
            .ok_or_else(|| Error::protocol(format!("process {} has no unit", pcb.id)))?;

        self.executor.pause(unit, tick)?;
        pcb.remaining_time = self.executor.remaining(unit)?;
        pcb.mark_blocked(tick);

        let key = ready_key(self.policy, pcb);
        self.events
            .record_process(process_event(pcb, tick, ProcessEventKind::Stopped));
        self.ready.insert(key, slot)?;
        Ok(next)
    }
}

/// Ready-structure key: priority for HPF, remaining time for SRTN.
fn ready_key(policy: SchedulingPolicy, pcb: &Pcb) -> u64 {
    match policy {
        SchedulingPolicy::HighestPriorityFirst => u64::from(pcb.priority),
        SchedulingPolicy::ShortestRemainingTimeNext => pcb.remaining_time,
        SchedulingPolicy::RoundRobin { .. } => 0,
    }
}

fn process_event(pcb: &Pcb, tick: Tick, kind: ProcessEventKind) -> ProcessEvent {
    ProcessEvent {
        tick,
        process: pcb.id,
        kind,
        arrival: pcb.arrival_time,
        total: pcb.run_time,
        remaining: pcb.remaining_time,
        waiting: pcb.waiting_time,
        completion: None,
    }
}

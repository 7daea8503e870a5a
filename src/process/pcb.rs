//! Process control block.

use crate::executor::UnitId;
use crate::memory::Block;
use crate::workload::ProcessSpec;
use crate::Tick;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable process identifier taken from the workload description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessId(pub u32);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state. `Running` is tracked for the PCB held in the scheduler's
/// running slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    Ready,
    Running,
    Blocked,
    Finished,
}

#[derive(Debug, Clone)]
pub struct Pcb {
    pub id: ProcessId,
    pub arrival_time: Tick,
    pub run_time: u64,
    pub priority: u32,
    pub remaining_time: u64,
    pub state: ProcessState,
    pub waiting_time: u64,
    pub wait_start: Tick,
    pub unit: Option<UnitId>,
    pub memory: Block,
}

impl Pcb {
    /// Build the control block for an admitted arrival.
    pub fn admit(spec: &ProcessSpec, memory: Block) -> Self {
        Self {
            id: spec.id,
            arrival_time: spec.arrival_time,
            run_time: spec.run_time,
            priority: spec.priority,
            remaining_time: spec.run_time,
            state: ProcessState::Ready,
            waiting_time: 0,
            wait_start: spec.arrival_time,
            unit: None,
            memory,
        }
    }

    /// First dispatch: waiting time is everything since arrival.
    pub(crate) fn mark_started(&mut self, tick: Tick, unit: UnitId) {
        self.waiting_time = tick.saturating_sub(self.arrival_time);
        self.unit = Some(unit);
        self.state = ProcessState::Running;
    }

    pub(crate) fn mark_blocked(&mut self, tick: Tick) {
        self.state = ProcessState::Blocked;
        self.wait_start = tick;
    }

    /// Re-dispatch after preemption: add the blocked interval to waiting time.
    pub(crate) fn mark_resumed(&mut self, tick: Tick) {
        self.waiting_time += tick.saturating_sub(self.wait_start);
        self.state = ProcessState::Running;
    }

    pub fn turnaround(&self, finish: Tick) -> u64 {
        finish.saturating_sub(self.arrival_time)
    }

    pub fn weighted_turnaround(&self, finish: Tick) -> f64 {
        if self.run_time == 0 {
            return 0.0;
        }
        self.turnaround(finish) as f64 / self.run_time as f64
    }
}

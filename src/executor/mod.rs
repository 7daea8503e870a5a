//! Execution units: the pseudo-workloads that burn simulated CPU time on
//! behalf of a running process.
//!
//! The scheduler core only talks to units through the [`Executor`] trait.
//! [`ThreadedExecutor`] runs each unit on its own thread and coordinates over
//! channels; [`SimulatedExecutor`] keeps units in-process for lockstep runs.

pub mod simulated;
pub mod threaded;
pub mod unit;

pub use simulated::SimulatedExecutor;
pub use threaded::ThreadedExecutor;

use crate::error::Result;
use crate::process::ProcessId;
use crate::Tick;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of an execution unit bound to a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit-{}", self.0)
    }
}

/// Control surface the scheduler core uses to drive execution units.
pub trait Executor {
    /// Launch a unit for `process`, seeding its mirror with `remaining`.
    /// The unit starts counting on the first tick after `tick`.
    fn start(&mut self, process: ProcessId, remaining: u64, tick: Tick) -> Result<UnitId>;

    /// Stop the unit from consuming further ticks. Returns once acknowledged.
    fn pause(&mut self, unit: UnitId, tick: Tick) -> Result<()>;

    /// Let a paused unit consume ticks again, starting after `tick`.
    fn resume(&mut self, unit: UnitId, tick: Tick) -> Result<()>;

    /// Current value of the unit's remaining-time mirror.
    fn remaining(&self, unit: UnitId) -> Result<u64>;

    /// Release a unit that has reported completion.
    fn reap(&mut self, unit: UnitId) -> Result<()>;

    /// Number of units not yet reaped.
    fn live_units(&self) -> usize;

    /// Tear down every remaining unit.
    fn shutdown(&mut self) {}
}

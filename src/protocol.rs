//! Messages and shared state exchanged between the scheduler core and its
//! collaborators (generator, clock, execution units).

use crate::executor::UnitId;
use crate::workload::ProcessSpec;
use crate::Tick;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Generator → core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorMessage {
    Arrival(ProcessSpec),
    /// Every arrival due at this tick has been sent.
    BatchComplete(Tick),
    /// No further arrivals will be sent. Also closes the current batch.
    Exhausted,
}

/// Core → unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitCommand {
    Pause,
    /// Resume counting with ticks strictly after `at`.
    Resume { at: Tick },
    Stop,
}

/// Unit → core, in reply to [`UnitCommand::Pause`] / [`UnitCommand::Resume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitAck {
    Paused { remaining: u64 },
    Resumed { remaining: u64 },
}

/// Unit → core, once per tick while the unit is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitReport {
    Progress { unit: UnitId, tick: Tick, remaining: u64 },
    Finished { unit: UnitId, tick: Tick },
}

impl UnitReport {
    pub fn unit(&self) -> UnitId {
        match *self {
            UnitReport::Progress { unit, .. } | UnitReport::Finished { unit, .. } => unit,
        }
    }

    pub fn tick(&self) -> Tick {
        match *self {
            UnitReport::Progress { tick, .. } | UnitReport::Finished { tick, .. } => tick,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, UnitReport::Finished { .. })
    }
}

/// Remaining-time mirror: written by the unit, read by the core.
#[derive(Debug, Clone, Default)]
pub struct RemainingMirror(Arc<AtomicU64>);

impl RemainingMirror {
    pub fn new(seed: u64) -> Self {
        Self(Arc::new(AtomicU64::new(seed)))
    }

    pub fn load(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn store(&self, remaining: u64) {
        self.0.store(remaining, Ordering::Release);
    }
}

//! In-process execution units for deterministic lockstep runs.

use super::unit::UnitState;
use super::{Executor, UnitId};
use crate::error::{Error, Result};
use crate::process::ProcessId;
use crate::protocol::{RemainingMirror, UnitCommand, UnitReport};
use crate::Tick;
use std::collections::BTreeMap;

#[derive(Debug)]
struct SimUnit {
    process: ProcessId,
    state: UnitState,
}

/// Executor whose units live on the caller's thread. Ticks are delivered
/// explicitly through [`SimulatedExecutor::advance`].
#[derive(Debug, Default)]
pub struct SimulatedExecutor {
    units: BTreeMap<UnitId, SimUnit>,
    next_id: u64,
}

impl SimulatedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let every running unit consume `tick`. Returns one report per unit that
    /// counted the tick.
    pub fn advance(&mut self, tick: Tick) -> Vec<UnitReport> {
        self.units
            .values_mut()
            .filter_map(|u| u.state.on_tick(tick))
            .collect()
    }

    fn unit_mut(&mut self, unit: UnitId) -> Result<&mut SimUnit> {
        self.units
            .get_mut(&unit)
            .ok_or_else(|| Error::executor(format!("unknown {}", unit)))
    }
}

impl Executor for SimulatedExecutor {
    fn start(&mut self, process: ProcessId, remaining: u64, tick: Tick) -> Result<UnitId> {
        let unit = UnitId(self.next_id);
        self.next_id += 1;

        self.units.insert(
            unit,
            SimUnit {
                process,
                state: UnitState::new(unit, RemainingMirror::new(remaining), tick),
            },
        );
        Ok(unit)
    }

    fn pause(&mut self, unit: UnitId, _tick: Tick) -> Result<()> {
        self.unit_mut(unit)?.state.on_command(UnitCommand::Pause);
        Ok(())
    }

    fn resume(&mut self, unit: UnitId, tick: Tick) -> Result<()> {
        self.unit_mut(unit)?
            .state
            .on_command(UnitCommand::Resume { at: tick });
        Ok(())
    }

    fn remaining(&self, unit: UnitId) -> Result<u64> {
        self.units
            .get(&unit)
            .map(|u| u.state.mirror.load())
            .ok_or_else(|| Error::executor(format!("unknown {}", unit)))
    }

    fn reap(&mut self, unit: UnitId) -> Result<()> {
        let reaped = self
            .units
            .remove(&unit)
            .ok_or_else(|| Error::executor(format!("unknown {}", unit)))?;
        log::trace!("reaped {} (process {})", unit, reaped.process);
        Ok(())
    }

    fn live_units(&self) -> usize {
        self.units.len()
    }

    fn shutdown(&mut self) {
        self.units.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_counts_down_after_start_tick() {
        let mut exec = SimulatedExecutor::new();
        let unit = exec.start(ProcessId(1), 2, 3).unwrap();

        assert!(exec.advance(3).is_empty());
        assert_eq!(
            exec.advance(4),
            vec![UnitReport::Progress {
                unit,
                tick: 4,
                remaining: 1
            }]
        );
        assert_eq!(exec.advance(5), vec![UnitReport::Finished { unit, tick: 5 }]);
        assert_eq!(exec.remaining(unit).unwrap(), 0);
        assert!(exec.advance(6).is_empty());
    }

    #[test]
    fn test_paused_unit_ignores_ticks() {
        let mut exec = SimulatedExecutor::new();
        let unit = exec.start(ProcessId(1), 5, 0).unwrap();
        exec.advance(1);
        exec.pause(unit, 1).unwrap();
        assert!(exec.advance(2).is_empty());
        assert!(exec.advance(3).is_empty());
        assert_eq!(exec.remaining(unit).unwrap(), 4);

        exec.resume(unit, 3).unwrap();
        assert_eq!(exec.advance(4).len(), 1);
        assert_eq!(exec.remaining(unit).unwrap(), 3);
    }

    #[test]
    fn test_reap_unknown_unit_fails() {
        let mut exec = SimulatedExecutor::new();
        let unit = exec.start(ProcessId(7), 1, 0).unwrap();
        assert_eq!(exec.live_units(), 1);
        exec.reap(unit).unwrap();
        assert!(exec.reap(unit).is_err());
        assert_eq!(exec.live_units(), 0);
    }
}

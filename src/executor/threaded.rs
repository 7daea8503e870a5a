use super::unit::{self, UnitChannels, UnitState};
use super::{Executor, UnitId};
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::process::ProcessId;
use crate::protocol::{RemainingMirror, UnitAck, UnitCommand, UnitReport};
use crate::Tick;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct UnitHandle {
    process: ProcessId,
    control: Sender<UnitCommand>,
    acks: Receiver<UnitAck>,
    mirror: RemainingMirror,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for UnitHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitHandle")
            .field("process", &self.process)
            .field("remaining", &self.mirror.load())
            .finish()
    }
}

/// One OS thread per execution unit. Units follow the shared [`Clock`] and
/// report to a single channel owned by the caller.
#[derive(Debug)]
pub struct ThreadedExecutor {
    clock: Arc<Clock>,
    reports: Sender<UnitReport>,
    units: HashMap<UnitId, UnitHandle>,
    next_id: u64,
    name_prefix: String,
    ack_timeout: Duration,
}

impl ThreadedExecutor {
    pub fn new(
        clock: Arc<Clock>,
        reports: Sender<UnitReport>,
        name_prefix: impl Into<String>,
        ack_timeout: Duration,
    ) -> Self {
        Self {
            clock,
            reports,
            units: HashMap::new(),
            next_id: 0,
            name_prefix: name_prefix.into(),
            ack_timeout,
        }
    }

    fn handle(&self, unit: UnitId) -> Result<&UnitHandle> {
        self.units
            .get(&unit)
            .ok_or_else(|| Error::executor(format!("unknown {}", unit)))
    }

    // send a command and block for its ack
    fn command(&self, unit: UnitId, cmd: UnitCommand) -> Result<UnitAck> {
        let handle = self.handle(unit)?;
        handle
            .control
            .send(cmd)
            .map_err(|_| Error::channel(format!("{} hung up", unit)))?;

        handle.acks.recv_timeout(self.ack_timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => {
                Error::channel(format!("{} did not acknowledge {:?}", unit, cmd))
            }
            RecvTimeoutError::Disconnected => Error::channel(format!("{} hung up", unit)),
        })
    }

    fn stop_unit(unit: UnitId, mut handle: UnitHandle) {
        let _ = handle.control.send(UnitCommand::Stop);
        if let Some(thread) = handle.thread.take() {
            if thread.join().is_err() {
                log::warn!("{} panicked", unit);
            }
        }
    }
}

impl Executor for ThreadedExecutor {
    fn start(&mut self, process: ProcessId, remaining: u64, tick: Tick) -> Result<UnitId> {
        let unit = UnitId(self.next_id);
        self.next_id += 1;

        let (control_tx, control_rx) = unbounded();
        let (ack_tx, ack_rx) = bounded(1);
        // subscribe before spawning so no tick after `tick` is missed
        let (_, ticks) = self.clock.subscribe();
        let mirror = RemainingMirror::new(remaining);

        let state = UnitState::new(unit, mirror.clone(), tick);
        let channels = UnitChannels {
            control: control_rx,
            acks: ack_tx,
            ticks,
            reports: self.reports.clone(),
        };

        let name = format!("{}-{}", self.name_prefix, process);
        let thread = thread::Builder::new()
            .name(name)
            .spawn(move || unit::run(state, channels))
            .map_err(|e| Error::executor(format!("spawn failed: {}", e)))?;

        self.units.insert(
            unit,
            UnitHandle {
                process,
                control: control_tx,
                acks: ack_rx,
                mirror,
                thread: Some(thread),
            },
        );
        Ok(unit)
    }

    fn pause(&mut self, unit: UnitId, _tick: Tick) -> Result<()> {
        match self.command(unit, UnitCommand::Pause)? {
            UnitAck::Paused { .. } => Ok(()),
            other => Err(Error::protocol(format!(
                "{} answered pause with {:?}",
                unit, other
            ))),
        }
    }

    fn resume(&mut self, unit: UnitId, tick: Tick) -> Result<()> {
        match self.command(unit, UnitCommand::Resume { at: tick })? {
            UnitAck::Resumed { .. } => Ok(()),
            other => Err(Error::protocol(format!(
                "{} answered resume with {:?}",
                unit, other
            ))),
        }
    }

    fn remaining(&self, unit: UnitId) -> Result<u64> {
        Ok(self.handle(unit)?.mirror.load())
    }

    fn reap(&mut self, unit: UnitId) -> Result<()> {
        let handle = self
            .units
            .remove(&unit)
            .ok_or_else(|| Error::executor(format!("unknown {}", unit)))?;
        Self::stop_unit(unit, handle);
        Ok(())
    }

    fn live_units(&self) -> usize {
        self.units.len()
    }

    fn shutdown(&mut self) {
        for (unit, handle) in self.units.drain() {
            Self::stop_unit(unit, handle);
        }
    }
}

impl Drop for ThreadedExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor(clock: &Arc<Clock>) -> (ThreadedExecutor, Receiver<UnitReport>) {
        let (tx, rx) = unbounded();
        let exec = ThreadedExecutor::new(clock.clone(), tx, "test-unit", Duration::from_secs(5));
        (exec, rx)
    }

    #[test]
    fn test_unit_reports_each_tick() {
        let clock = Arc::new(Clock::new());
        let (mut exec, reports) = executor(&clock);
        let unit = exec.start(ProcessId(1), 2, 0).unwrap();

        clock.advance();
        let first = reports.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(
            first,
            UnitReport::Progress {
                unit,
                tick: 1,
                remaining: 1
            }
        );

        clock.advance();
        let second = reports.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(second, UnitReport::Finished { unit, tick: 2 });
        assert_eq!(exec.remaining(unit).unwrap(), 0);

        exec.reap(unit).unwrap();
        assert_eq!(exec.live_units(), 0);
    }

    #[test]
    fn test_paused_unit_stays_quiet() {
        let clock = Arc::new(Clock::new());
        let (mut exec, reports) = executor(&clock);
        let unit = exec.start(ProcessId(1), 5, 0).unwrap();

        exec.pause(unit, 0).unwrap();
        clock.advance();
        clock.advance();
        assert!(reports.recv_timeout(Duration::from_millis(50)).is_err());
        assert_eq!(exec.remaining(unit).unwrap(), 5);

        exec.resume(unit, 2).unwrap();
        clock.advance();
        let report = reports.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(report.tick(), 3);
        assert_eq!(exec.remaining(unit).unwrap(), 4);
    }

    #[test]
    fn test_shutdown_joins_units() {
        let clock = Arc::new(Clock::new());
        let (mut exec, _reports) = executor(&clock);
        exec.start(ProcessId(1), 5, 0).unwrap();
        exec.start(ProcessId(2), 5, 0).unwrap();
        assert_eq!(exec.live_units(), 2);

        exec.shutdown();
        assert_eq!(exec.live_units(), 0);
        assert!(exec.pause(UnitId(0), 0).is_err());
    }
}

//! Process generator: replays a [`Workload`] against the clock.
//!
//! For every tick the generator sends each arrival due at that tick followed
//! by [`GeneratorMessage::BatchComplete`], so the core knows when it has seen
//! all arrivals for the tick. After the last arrival it sends
//! [`GeneratorMessage::Exhausted`] and exits.

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::protocol::GeneratorMessage;
use crate::workload::{ProcessSpec, Workload};
use crate::Tick;
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[derive(Debug)]
pub struct Generator {
    thread: Option<JoinHandle<Result<()>>>,
}

impl Generator {
    pub fn start(
        workload: Workload,
        clock: Arc<Clock>,
        messages: Sender<GeneratorMessage>,
    ) -> Result<Self> {
        let (now, ticks) = clock.subscribe();

        let thread = thread::Builder::new()
            .name("schedsim-generator".to_string())
            .spawn(move || replay(workload.processes(), now, ticks, messages))
            .map_err(|e| Error::executor(format!("generator spawn failed: {}", e)))?;

        Ok(Self {
            thread: Some(thread),
        })
    }

    /// Wait for the generator to finish and surface its result.
    pub fn join(mut self) -> Result<()> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| Error::executor("generator panicked"))?,
            None => Ok(()),
        }
    }
}

impl Drop for Generator {
    fn drop(&mut self) {
        // the thread exits once the clock stops or the core hangs up
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn replay(
    processes: &[ProcessSpec],
    mut tick: Tick,
    ticks: Receiver<Tick>,
    messages: Sender<GeneratorMessage>,
) -> Result<()> {
    let mut pending = processes.iter().peekable();

    loop {
        while let Some(spec) = pending.next_if(|p| p.arrival_time <= tick) {
            log::debug!("tick {}: process {} arrives", tick, spec.id);
            messages.send(GeneratorMessage::Arrival(*spec))?;
        }

        if pending.peek().is_none() {
            messages.send(GeneratorMessage::Exhausted)?;
            return Ok(());
        }
        messages.send(GeneratorMessage::BatchComplete(tick))?;

        tick = match ticks.recv() {
            Ok(next) => next,
            // clock stopped before the workload ran out
            Err(_) => return Ok(()),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_replay_batches_by_tick() {
        let workload = Workload::new(vec![
            ProcessSpec::new(1, 0, 3, 1, 10),
            ProcessSpec::new(2, 2, 3, 1, 10),
            ProcessSpec::new(3, 2, 3, 1, 10),
        ])
        .unwrap();
        let clock = Arc::new(Clock::new());
        let (tx, rx) = unbounded();
        let generator = Generator::start(workload, clock.clone(), tx).unwrap();

        assert_eq!(
            rx.recv().unwrap(),
            GeneratorMessage::Arrival(ProcessSpec::new(1, 0, 3, 1, 10))
        );
        assert_eq!(rx.recv().unwrap(), GeneratorMessage::BatchComplete(0));

        clock.advance();
        assert_eq!(rx.recv().unwrap(), GeneratorMessage::BatchComplete(1));

        clock.advance();
        assert!(matches!(rx.recv().unwrap(), GeneratorMessage::Arrival(p) if p.id.0 == 2));
        assert!(matches!(rx.recv().unwrap(), GeneratorMessage::Arrival(p) if p.id.0 == 3));
        assert_eq!(rx.recv().unwrap(), GeneratorMessage::Exhausted);

        generator.join().unwrap();
    }

    #[test]
    fn test_empty_workload_is_exhausted_immediately() {
        let clock = Arc::new(Clock::new());
        let (tx, rx) = unbounded();
        let generator = Generator::start(Workload::default(), clock, tx).unwrap();
        assert_eq!(rx.recv().unwrap(), GeneratorMessage::Exhausted);
        generator.join().unwrap();
    }

    #[test]
    fn test_stopped_clock_ends_replay() {
        let workload = Workload::new(vec![ProcessSpec::new(1, 50, 3, 1, 10)]).unwrap();
        let clock = Arc::new(Clock::new());
        let (tx, rx) = unbounded();
        let generator = Generator::start(workload, clock.clone(), tx).unwrap();

        assert_eq!(rx.recv().unwrap(), GeneratorMessage::BatchComplete(0));
        clock.stop();
        generator.join().unwrap();
    }
}

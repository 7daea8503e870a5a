//! Simulated clock shared by the generator, the scheduler core and the
//! execution units.
//!
//! The counter only moves forward once the core has settled the current
//! tick, so a participant can never observe tick `t + 1` while the core is
//! still making decisions for tick `t`.

use crate::error::{Error, Result};
use crate::Tick;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug)]
struct ClockState {
    tick: Tick,
    settled: Option<Tick>,
    stopped: bool,
    subscribers: Vec<Sender<Tick>>,
}

#[derive(Debug)]
pub struct Clock {
    state: Mutex<ClockState>,
    changed: Condvar,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ClockState {
                tick: 0,
                settled: None,
                stopped: false,
                subscribers: Vec::new(),
            }),
            changed: Condvar::new(),
        }
    }

    pub fn now(&self) -> Tick {
        self.state.lock().tick
    }

    /// Current tick plus a channel receiving every later tick.
    pub fn subscribe(&self) -> (Tick, Receiver<Tick>) {
        let (tx, rx) = unbounded();
        let mut state = self.state.lock();
        if !state.stopped {
            state.subscribers.push(tx);
        }
        (state.tick, rx)
    }

    /// The core is done with `tick`; the clock may move past it.
    pub fn settle(&self, tick: Tick) {
        let mut state = self.state.lock();
        if state.settled.map_or(true, |s| s < tick) {
            state.settled = Some(tick);
        }
        self.changed.notify_all();
    }

    /// Advance by one tick and broadcast it. `None` once stopped.
    pub fn advance(&self) -> Option<Tick> {
        let mut state = self.state.lock();
        if state.stopped {
            return None;
        }

        state.tick += 1;
        let tick = state.tick;
        state.subscribers.retain(|tx| tx.send(tick).is_ok());
        self.changed.notify_all();
        Some(tick)
    }

    /// Block until the current tick has been settled. Returns `false` if the
    /// clock was stopped while waiting.
    pub fn wait_settled(&self) -> bool {
        let mut state = self.state.lock();
        while !state.stopped && state.settled.map_or(true, |s| s < state.tick) {
            self.changed.wait(&mut state);
        }
        !state.stopped
    }

    /// Block until the clock moves past `after`. `None` if stopped first.
    pub fn wait_past(&self, after: Tick) -> Option<Tick> {
        let mut state = self.state.lock();
        while !state.stopped && state.tick <= after {
            self.changed.wait(&mut state);
        }
        if state.stopped {
            None
        } else {
            Some(state.tick)
        }
    }

    /// Stop the clock. Subscribers see their channel disconnect.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.stopped = true;
        state.subscribers.clear();
        self.changed.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread that drives a [`Clock`] forward.
#[derive(Debug)]
pub struct ClockDriver {
    clock: Arc<Clock>,
    thread: Option<JoinHandle<()>>,
}

impl ClockDriver {
    /// Start ticking. Each tick waits for the previous one to be settled and
    /// then for `interval` to elapse.
    pub fn start(clock: Arc<Clock>, interval: Duration) -> Result<Self> {
        let driven = clock.clone();
        let thread = thread::Builder::new()
            .name("schedsim-clock".to_string())
            .spawn(move || {
                while driven.wait_settled() {
                    if !interval.is_zero() {
                        thread::sleep(interval);
                    }
                    if driven.advance().is_none() {
                        break;
                    }
                }
            })
            .map_err(|e| Error::executor(format!("clock spawn failed: {}", e)))?;

        Ok(Self {
            clock,
            thread: Some(thread),
        })
    }

    pub fn stop(&mut self) {
        self.clock.stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ClockDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_receive_later_ticks() {
        let clock = Clock::new();
        let (start, rx) = clock.subscribe();
        assert_eq!(start, 0);

        assert_eq!(clock.advance(), Some(1));
        assert_eq!(clock.advance(), Some(2));
        assert_eq!(rx.try_recv(), Ok(1));
        assert_eq!(rx.try_recv(), Ok(2));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stop_disconnects_subscribers() {
        let clock = Clock::new();
        let (_, rx) = clock.subscribe();
        clock.stop();
        assert!(rx.recv().is_err());
        assert_eq!(clock.advance(), None);
        assert!(clock.is_stopped());
    }

    #[test]
    fn test_driver_waits_for_settle() {
        let clock = Arc::new(Clock::new());
        let (_, rx) = clock.subscribe();
        let mut driver = ClockDriver::start(clock.clone(), Duration::ZERO).unwrap();

        // Nothing moves until tick 0 is settled.
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        assert_eq!(clock.now(), 0);

        clock.settle(0);
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(1));

        clock.settle(1);
        assert_eq!(clock.wait_past(1), Some(2));

        driver.stop();
        assert!(clock.is_stopped());
    }
}

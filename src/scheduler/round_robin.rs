//! Preemptive round robin with a fixed quantum.
//!
//! The quantum only counts down on ticks where another process is waiting;
//! a process alone on the CPU is never sliced.

use super::Scheduler;
use crate::error::Result;
use crate::executor::Executor;
use crate::Tick;

pub(crate) fn dispatch<E: Executor>(
    sched: &mut Scheduler<E>,
    tick: Tick,
    quantum: u64,
) -> Result<()> {
    let next = if sched.refresh_running()?.is_some() {
        sched.quantum_remaining = sched.quantum_remaining.saturating_sub(1);
        if sched.quantum_remaining > 0 {
            return Ok(());
        }
        sched.preempt(tick)?
    } else {
        sched.take_ready()?
    };

    sched.quantum_remaining = quantum;
    sched.start_or_resume(tick, next)
}

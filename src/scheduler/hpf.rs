//! Non-preemptive highest priority first.
//!
//! The lowest priority value wins. Once a process holds the CPU it keeps it
//! until it finishes; a later, more urgent arrival waits in the heap.

use super::Scheduler;
use crate::error::Result;
use crate::executor::Executor;
use crate::Tick;

pub(crate) fn dispatch<E: Executor>(sched: &mut Scheduler<E>, tick: Tick) -> Result<()> {
    if sched.refresh_running()?.is_some() {
        return Ok(());
    }

    let next = sched.take_ready()?;
    sched.start_or_resume(tick, next)
}

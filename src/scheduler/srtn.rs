//! Preemptive shortest remaining time next.
//!
//! Ready PCBs are keyed by remaining time. The running process is preempted
//! as soon as a ready process needs strictly less time than it has left.

use super::Scheduler;
use crate::error::Result;
use crate::executor::Executor;
use crate::Tick;

pub(crate) fn dispatch<E: Executor>(sched: &mut Scheduler<E>, tick: Tick) -> Result<()> {
    let next = match sched.refresh_running()? {
        Some(remaining) => match sched.ready.peek_key() {
            Some(shortest) if remaining > shortest => {
                log::trace!(
                    "tick {}: preempting ({} left, {} ready)",
                    tick,
                    remaining,
                    shortest
                );
                sched.preempt(tick)?
            }
            _ => return Ok(()),
        },
        None => sched.take_ready()?,
    };

    sched.start_or_resume(tick, next)
}

// execution unit thread body
use super::UnitId;
use crate::protocol::{RemainingMirror, UnitAck, UnitCommand, UnitReport};
use crate::Tick;
use crossbeam_channel::{select, Receiver, Sender};

/// Channels a unit thread owns.
#[derive(Debug)]
pub(crate) struct UnitChannels {
    pub control: Receiver<UnitCommand>,
    pub acks: Sender<UnitAck>,
    pub ticks: Receiver<Tick>,
    pub reports: Sender<UnitReport>,
}

#[derive(Debug)]
pub(crate) struct UnitState {
    pub unit: UnitId,
    pub mirror: RemainingMirror,
    pub paused: bool,
    /// Ticks at or below this value were already accounted for.
    pub floor: Tick,
}

impl UnitState {
    pub fn new(unit: UnitId, mirror: RemainingMirror, floor: Tick) -> Self {
        Self {
            unit,
            mirror,
            paused: false,
            floor,
        }
    }

    /// Count one tick. `None` when the tick does not belong to this unit.
    pub fn on_tick(&mut self, tick: Tick) -> Option<UnitReport> {
        if self.paused || tick <= self.floor {
            return None;
        }
        let remaining = self.mirror.load();
        if remaining == 0 {
            return None;
        }

        self.floor = tick;
        let remaining = remaining - 1;
        self.mirror.store(remaining);

        Some(if remaining == 0 {
            UnitReport::Finished {
                unit: self.unit,
                tick,
            }
        } else {
            UnitReport::Progress {
                unit: self.unit,
                tick,
                remaining,
            }
        })
    }

    /// Apply a control command. Returns the ack to send, or `None` on stop.
    pub fn on_command(&mut self, cmd: UnitCommand) -> Option<UnitAck> {
        match cmd {
            UnitCommand::Pause => {
                self.paused = true;
                Some(UnitAck::Paused {
                    remaining: self.mirror.load(),
                })
            }
            UnitCommand::Resume { at } => {
                self.paused = false;
                self.floor = self.floor.max(at);
                Some(UnitAck::Resumed {
                    remaining: self.mirror.load(),
                })
            }
            UnitCommand::Stop => None,
        }
    }
}

// main loop, exits on Stop or when either the core or the clock hangs up
pub(crate) fn run(mut state: UnitState, channels: UnitChannels) {
    let UnitChannels {
        control,
        acks,
        ticks,
        reports,
    } = channels;

    loop {
        select! {
            recv(control) -> cmd => {
                let ack = match cmd {
                    Ok(cmd) => state.on_command(cmd),
                    Err(_) => None,
                };
                match ack {
                    Some(ack) => {
                        if acks.send(ack).is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            recv(ticks) -> tick => {
                let tick = match tick {
                    Ok(tick) => tick,
                    Err(_) => break,
                };
                if let Some(report) = state.on_tick(tick) {
                    log::trace!("{} consumed tick {}", state.unit, tick);
                    if reports.send(report).is_err() {
                        break;
                    }
                }
            }
        }
    }

    log::trace!("{} exiting", state.unit);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_ignores_ticks_before_floor() {
        let mut state = UnitState::new(UnitId(0), RemainingMirror::new(2), 5);
        assert_eq!(state.on_tick(4), None);
        assert_eq!(state.on_tick(5), None);
        assert_eq!(
            state.on_tick(6),
            Some(UnitReport::Progress {
                unit: UnitId(0),
                tick: 6,
                remaining: 1
            })
        );
        // a duplicate tick is never counted twice
        assert_eq!(state.on_tick(6), None);
        assert_eq!(
            state.on_tick(7),
            Some(UnitReport::Finished {
                unit: UnitId(0),
                tick: 7
            })
        );
    }

    #[test]
    fn test_pause_and_resume_ack_remaining() {
        let mut state = UnitState::new(UnitId(0), RemainingMirror::new(3), 0);
        state.on_tick(1);
        assert_eq!(
            state.on_command(UnitCommand::Pause),
            Some(UnitAck::Paused { remaining: 2 })
        );
        assert_eq!(state.on_tick(2), None);
        assert_eq!(
            state.on_command(UnitCommand::Resume { at: 4 }),
            Some(UnitAck::Resumed { remaining: 2 })
        );
        assert_eq!(state.on_tick(3), None);
        assert_eq!(state.on_tick(4), None);
        assert!(state.on_tick(5).is_some());
        assert_eq!(state.on_command(UnitCommand::Stop), None);
    }
}

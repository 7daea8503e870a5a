//! Auditable event log of process lifecycle and memory activity.

use crate::error::Result;
use crate::memory::BlockRange;
use crate::process::ProcessId;
use crate::Tick;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::path::Path;

pub const PROCESS_LOG_HEADER: &str = "#At time x process y state arr w total z remain y wait k";
pub const MEMORY_LOG_HEADER: &str = "#At time x allocated y bytes for process z from i to j";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessEventKind {
    Started,
    Stopped,
    Resumed,
    Finished,
}

impl ProcessEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessEventKind::Started => "started",
            ProcessEventKind::Stopped => "stopped",
            ProcessEventKind::Resumed => "resumed",
            ProcessEventKind::Finished => "finished",
        }
    }
}

/// Turnaround figures attached to a `finished` event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub turnaround: u64,
    pub weighted_turnaround: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessEvent {
    pub tick: Tick,
    pub process: ProcessId,
    pub kind: ProcessEventKind,
    pub arrival: Tick,
    pub total: u64,
    pub remaining: u64,
    pub waiting: u64,
    pub completion: Option<Completion>,
}

impl fmt::Display for ProcessEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "At time {} process {} {} arr {} total {} remain {} wait {}",
            self.tick,
            self.process,
            self.kind.as_str(),
            self.arrival,
            self.total,
            self.remaining,
            self.waiting
        )?;
        if let Some(done) = &self.completion {
            write!(
                f,
                " TA {} WTA {:.2}",
                done.turnaround, done.weighted_turnaround
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryEventKind {
    Allocated,
    Freed,
    /// No fitting block; the arrival was dropped.
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEvent {
    pub tick: Tick,
    pub process: ProcessId,
    pub kind: MemoryEventKind,
    /// Block size for allocations and frees, requested size for rejections.
    pub size: usize,
    pub range: Option<BlockRange>,
}

impl fmt::Display for MemoryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            MemoryEventKind::Allocated => "allocated",
            MemoryEventKind::Freed => "freed",
            MemoryEventKind::Rejected => {
                return write!(
                    f,
                    "At time {} couldn't allocate {} bytes for process {}",
                    self.tick, self.size, self.process
                );
            }
        };
        write!(
            f,
            "At time {} {} {} bytes for process {}",
            self.tick, verb, self.size, self.process
        )?;
        if let Some(range) = &self.range {
            write!(f, " from {} to {}", range.start, range.end)?;
        }
        Ok(())
    }
}

/// Chronological record of everything the scheduler did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    process: Vec<ProcessEvent>,
    memory: Vec<MemoryEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_process(&mut self, event: ProcessEvent) {
        log::debug!("{}", event);
        self.process.push(event);
    }

    pub fn record_memory(&mut self, event: MemoryEvent) {
        match event.kind {
            MemoryEventKind::Rejected => log::warn!("{}", event),
            _ => log::debug!("{}", event),
        }
        self.memory.push(event);
    }

    pub fn process_events(&self) -> &[ProcessEvent] {
        &self.process
    }

    pub fn memory_events(&self) -> &[MemoryEvent] {
        &self.memory
    }

    /// Events of one process, in order.
    pub fn events_for(&self, id: ProcessId) -> impl Iterator<Item = &ProcessEvent> {
        self.process.iter().filter(move |e| e.process == id)
    }

    /// `scheduler.log` contents.
    pub fn render_process_log(&self) -> String {
        render(PROCESS_LOG_HEADER, &self.process)
    }

    /// `memory.log` contents.
    pub fn render_memory_log(&self) -> String {
        render(MEMORY_LOG_HEADER, &self.memory)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

fn render<T: fmt::Display>(header: &str, events: &[T]) -> String {
    let mut out = String::with_capacity(64 * (events.len() + 1));
    out.push_str(header);
    out.push('\n');
    for event in events {
        let _ = writeln!(out, "{}", event);
    }
    out
}

pub use crate::config::{Config, ConfigBuilder, SchedulingPolicy};
pub use crate::error::{Error, Result};
pub use crate::executor::{Executor, SimulatedExecutor, ThreadedExecutor, UnitId};
pub use crate::memory::{Block, BlockRange, BuddyAllocator};
pub use crate::process::{Pcb, ProcessId, ProcessState};
pub use crate::runtime::Runtime;
pub use crate::scheduler::{Admission, Scheduler};
pub use crate::simulation::Simulation;
pub use crate::telemetry::{
    ConsoleExporter, EventLog, JsonExporter, LogFileExporter, PerformanceSummary, ReportExporter,
    SimulationReport,
};
pub use crate::workload::{ProcessSpec, Workload};
pub use crate::Tick;

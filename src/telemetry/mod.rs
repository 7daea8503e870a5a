//! Telemetry and reporting subsystem.
//!
//! Provides the auditable event log, scheduling metrics, and exporters for
//! the end-of-run report.

pub mod export;
pub mod metrics;
pub mod trace;

pub use export::{ConsoleExporter, JsonExporter, LogFileExporter, ReportExporter, SimulationReport};
pub use metrics::{Metrics, PerformanceSummary};
pub use trace::{
    Completion, EventLog, MemoryEvent, MemoryEventKind, ProcessEvent, ProcessEventKind,
};

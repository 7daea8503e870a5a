//! Report export for the end of a run.

use super::metrics::PerformanceSummary;
use super::trace::EventLog;
use crate::config::SchedulingPolicy;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub policy: SchedulingPolicy,
    pub summary: PerformanceSummary,
    pub events: EventLog,
}

impl SimulationReport {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Trait for writing a report somewhere.
pub trait ReportExporter {
    fn export(&self, report: &SimulationReport) -> Result<()>;
}

/// Writes `scheduler.log`, `memory.log` and `scheduler.perf` into a directory.
#[derive(Debug, Clone)]
pub struct LogFileExporter {
    dir: PathBuf,
}

impl LogFileExporter {
    pub const PROCESS_LOG: &'static str = "scheduler.log";
    pub const MEMORY_LOG: &'static str = "memory.log";
    pub const PERF_FILE: &'static str = "scheduler.perf";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ReportExporter for LogFileExporter {
    fn export(&self, report: &SimulationReport) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(
            self.dir.join(Self::PROCESS_LOG),
            report.events.render_process_log(),
        )?;
        std::fs::write(
            self.dir.join(Self::MEMORY_LOG),
            report.events.render_memory_log(),
        )?;
        std::fs::write(self.dir.join(Self::PERF_FILE), report.summary.render_perf())?;
        Ok(())
    }
}

/// Whole report as pretty JSON.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    output_path: PathBuf,
}

impl JsonExporter {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }
}

impl ReportExporter for JsonExporter {
    fn export(&self, report: &SimulationReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&self.output_path, json)?;
        Ok(())
    }
}

/// Prints the performance summary to stdout.
#[derive(Debug, Clone, Default)]
pub struct ConsoleExporter {
    verbose: bool,
}

impl ConsoleExporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ReportExporter for ConsoleExporter {
    fn export(&self, report: &SimulationReport) -> Result<()> {
        let s = &report.summary;
        println!("=== {} ===", report.policy);
        print!("{}", s.render_perf());

        if self.verbose {
            println!("Ticks: {} ({} busy, {} idle)", s.total_ticks, s.busy_ticks, s.idle_ticks);
            println!("Finished: {}  Rejected: {}", s.finished, s.rejected);
            println!("Avg turnaround = {:.2}", s.mean_turnaround);
            if let (Some(p50), Some(p99)) = (s.p50_turnaround, s.p99_turnaround) {
                println!("Turnaround p50 = {}  p99 = {}", p50, p99);
            }
        }

        Ok(())
    }
}

//! Workload descriptions: the arrival records fed to the generator.
//!
//! The text format is one process per line, whitespace separated:
//!
//! ```text
//! #id arrival runtime priority memsize
//! 1   0       5       3        100
//! 2   2       4       1        60
//! ```
//!
//! Lines starting with `#` and blank lines are ignored.

use crate::error::{Error, Result};
use crate::process::ProcessId;
use crate::Tick;
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::Path;

/// One arrival record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub id: ProcessId,
    pub arrival_time: Tick,
    pub run_time: u64,
    pub priority: u32,
    pub mem_size: usize,
}

impl ProcessSpec {
    pub fn new(id: u32, arrival_time: Tick, run_time: u64, priority: u32, mem_size: usize) -> Self {
        Self {
            id: ProcessId(id),
            arrival_time,
            run_time,
            priority,
            mem_size,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    processes: Vec<ProcessSpec>,
}

impl Workload {
    /// Build a validated workload. Records are kept in arrival order; ties
    /// keep their original relative order.
    pub fn new(mut processes: Vec<ProcessSpec>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(processes.len());
        for spec in &processes {
            if spec.run_time == 0 {
                return Err(Error::workload(format!(
                    "process {} has zero run time",
                    spec.id
                )));
            }
            if !seen.insert(spec.id) {
                return Err(Error::workload(format!("duplicate process id {}", spec.id)));
            }
        }

        processes.sort_by_key(|p| p.arrival_time);
        Ok(Self { processes })
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut processes = Vec::new();

        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 5 {
                return Err(Error::workload(format!(
                    "line {}: expected 5 fields (id arrival runtime priority memsize), found {}",
                    lineno + 1,
                    fields.len()
                )));
            }

            let field = |idx: usize, name: &str| -> Result<u64> {
                fields[idx].parse::<u64>().map_err(|_| {
                    Error::workload(format!(
                        "line {}: invalid {} '{}'",
                        lineno + 1,
                        name,
                        fields[idx]
                    ))
                })
            };

            let id = u32::try_from(field(0, "id")?)
                .map_err(|_| Error::workload(format!("line {}: id out of range", lineno + 1)))?;
            let priority = u32::try_from(field(3, "priority")?).map_err(|_| {
                Error::workload(format!("line {}: priority out of range", lineno + 1))
            })?;
            let mem_size = usize::try_from(field(4, "memsize")?).map_err(|_| {
                Error::workload(format!("line {}: memsize out of range", lineno + 1))
            })?;

            processes.push(ProcessSpec {
                id: ProcessId(id),
                arrival_time: field(1, "arrival")?,
                run_time: field(2, "runtime")?,
                priority,
                mem_size,
            });
        }

        Self::new(processes)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Random workload, reproducible from `seed`.
    ///
    /// Arrivals advance by 0..=10 ticks, run times are 1..=29, priorities
    /// 0..=10, and memory requests are spread so that `count` processes could
    /// share `arena_size` bytes.
    pub fn generate(count: usize, seed: u64, arena_size: usize) -> Result<Self> {
        let mut rng = Pcg64::seed_from_u64(seed);
        let mem_limit = (arena_size / count.max(1)).max(1);
        let mut arrival: Tick = 0;

        let mut processes = Vec::with_capacity(count);
        for i in 1..=count {
            arrival += rng.gen_range(0..=10);
            let id = u32::try_from(i)
                .map_err(|_| Error::workload(format!("cannot generate {} processes", count)))?;
            processes.push(ProcessSpec {
                id: ProcessId(id),
                arrival_time: arrival,
                run_time: rng.gen_range(1..30),
                priority: rng.gen_range(0..=10),
                mem_size: rng.gen_range(1..=mem_limit),
            });
        }

        Self::new(processes)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::from("#id\tarrival\truntime\tpriority\tmemsize\n");
        for p in &self.processes {
            let _ = writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}",
                p.id, p.arrival_time, p.run_time, p.priority, p.mem_size
            );
        }
        out
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_text())?;
        Ok(())
    }

    pub fn processes(&self) -> &[ProcessSpec] {
        &self.processes
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Tick at which the last process arrives.
    pub fn last_arrival(&self) -> Option<Tick> {
        self.processes.last().map(|p| p.arrival_time)
    }
}

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Dispatch algorithm used by the scheduler core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulingPolicy {
    /// Non-preemptive highest priority first (lowest value wins).
    HighestPriorityFirst,
    /// Preemptive shortest remaining time next.
    ShortestRemainingTimeNext,
    /// Preemptive round robin with a fixed time slice.
    RoundRobin { quantum: u64 },
}

impl SchedulingPolicy {
    /// Whether admitted processes go to the priority heap (as opposed to the FIFO).
    pub fn uses_heap(&self) -> bool {
        !matches!(self, SchedulingPolicy::RoundRobin { .. })
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            SchedulingPolicy::HighestPriorityFirst => "hpf",
            SchedulingPolicy::ShortestRemainingTimeNext => "srtn",
            SchedulingPolicy::RoundRobin { .. } => "rr",
        }
    }
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        SchedulingPolicy::HighestPriorityFirst
    }
}

impl fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingPolicy::RoundRobin { quantum } => write!(f, "rr(quantum={})", quantum),
            other => f.write_str(other.short_name()),
        }
    }
}

impl FromStr for SchedulingPolicy {
    type Err = Error;

    /// Accepts `hpf`, `srtn`, `rr` (quantum 1) and `rr:<quantum>`.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "hpf" => Ok(SchedulingPolicy::HighestPriorityFirst),
            "srtn" => Ok(SchedulingPolicy::ShortestRemainingTimeNext),
            "rr" => Ok(SchedulingPolicy::RoundRobin { quantum: 1 }),
            other => match other.strip_prefix("rr:") {
                Some(q) => {
                    let quantum = q
                        .parse::<u64>()
                        .map_err(|_| Error::config(format!("invalid quantum '{}'", q)))?;
                    Ok(SchedulingPolicy::RoundRobin { quantum })
                }
                None => Err(Error::config(format!(
                    "unknown policy '{}' (expected hpf, srtn, rr or rr:<quantum>)",
                    s
                ))),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub policy: SchedulingPolicy,
    pub arena_size: usize,
    pub ready_capacity: usize,
    pub tick_interval: Duration,
    /// Longest the threaded runtime waits on any single message before
    /// giving up on the run.
    pub stall_timeout: Duration,
    pub unit_name_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            policy: SchedulingPolicy::default(),
            arena_size: 1024,
            ready_capacity: 1000,
            tick_interval: Duration::ZERO,
            stall_timeout: Duration::from_secs(10),
            unit_name_prefix: "schedsim-unit".to_string(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if let SchedulingPolicy::RoundRobin { quantum } = self.policy {
            if quantum == 0 {
                return Err(Error::config("round robin quantum must be > 0"));
            }
        }

        if self.arena_size == 0 || !self.arena_size.is_power_of_two() {
            return Err(Error::config(format!(
                "arena_size must be a non-zero power of two (got {})",
                self.arena_size
            )));
        }

        if self.ready_capacity == 0 {
            return Err(Error::config("ready_capacity must be > 0"));
        }

        if self.stall_timeout <= self.tick_interval {
            return Err(Error::config(format!(
                "stall_timeout ({:?}) must exceed tick_interval ({:?})",
                self.stall_timeout, self.tick_interval
            )));
        }

        if self.unit_name_prefix.is_empty() {
            return Err(Error::config("unit_name_prefix must not be empty"));
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn policy(mut self, policy: SchedulingPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn arena_size(mut self, size: usize) -> Self {
        self.config.arena_size = size;
        self
    }

    pub fn ready_capacity(mut self, capacity: usize) -> Self {
        self.config.ready_capacity = capacity;
        self
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.config.tick_interval = interval;
        self
    }

    pub fn stall_timeout(mut self, timeout: Duration) -> Self {
        self.config.stall_timeout = timeout;
        self
    }

    pub fn unit_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.unit_name_prefix = prefix.into();
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

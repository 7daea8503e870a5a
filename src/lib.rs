//! schedsim - a uniprocessor CPU scheduler simulator
//!
//! A workload of process arrivals is replayed against a simulated clock. The
//! scheduler core admits each arrival by reserving memory from a buddy
//! allocator, queues it in a priority heap or a FIFO, and dispatches it under
//! one of three policies to an execution unit that burns simulated CPU time.
//!
//! # Quick Start
//!
//! ```no_run
//! use schedsim::prelude::*;
//!
//! let workload = Workload::parse("1 0 5 3 100\n2 1 3 1 60\n").unwrap();
//! let config = Config::builder()
//!     .policy(SchedulingPolicy::ShortestRemainingTimeNext)
//!     .build()
//!     .unwrap();
//!
//! let report = Simulation::new(config).unwrap().run(&workload).unwrap();
//! println!("{}", report.summary);
//! ```
//!
//! # Features
//!
//! - **Policies**: non-preemptive HPF, preemptive SRTN, round robin
//! - **Buddy Allocator**: power-of-two blocks with merge-on-free
//! - **Two Drivers**: threaded [`Runtime`] and deterministic [`Simulation`]
//! - **Telemetry**: event and memory logs, utilization and turnaround metrics

#![warn(missing_debug_implementations)]

pub mod clock;
pub mod config;
pub mod error;
pub mod executor;
pub mod generator;
pub mod logger;
pub mod memory;
pub mod prelude;
pub mod process;
pub mod protocol;
pub mod runtime;
pub mod scheduler;
pub mod simulation;
pub mod telemetry;
pub mod workload;

/// One unit of simulated time.
pub type Tick = u64;

pub use config::{Config, ConfigBuilder, SchedulingPolicy};
pub use error::{Error, Result};
pub use runtime::Runtime;
pub use simulation::Simulation;
pub use telemetry::SimulationReport;
pub use workload::{ProcessSpec, Workload};

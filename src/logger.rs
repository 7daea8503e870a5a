//! Minimal stderr logger behind the `log` facade.
//!
//! Stdout is reserved for the performance summary, so diagnostics go to
//! stderr with the level and the emitting thread's name.

use crate::error::{Error, Result};
use log::{LevelFilter, Metadata, Record};
use std::io::Write;

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let thread = std::thread::current();
        let _ = writeln!(
            std::io::stderr().lock(),
            "[{:<5}] [{}] {}",
            record.level(),
            thread.name().unwrap_or("?"),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: StderrLogger = StderrLogger;

/// Install the logger. Fails if another logger is already installed.
pub fn init(level: LevelFilter) -> Result<()> {
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(level))
        .map_err(|e| Error::config(format!("logger already installed: {}", e)))
}

/// Map a `-v` count to a level: warn, info, debug, trace.
pub fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

//! Per-process scheduling state.

pub mod pcb;
pub mod table;

pub use pcb::{Pcb, ProcessId, ProcessState};
pub use table::{PcbRef, PcbTable};

//! Simulated memory reservation for admitted processes.

pub mod buddy;

pub use buddy::{Block, BlockRange, BuddyAllocator};

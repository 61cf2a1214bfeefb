//! Deterministic simulation support.
//!
//! [`SimulatedStorage`] stands in for the index file so tests can count
//! block I/O and inject read, write and sync faults from a seeded RNG.
//! Given the same seed, execution is identical.

mod storage;

pub use storage::{FaultConfig, SimulatedStorage, SimulatedStorageStats};

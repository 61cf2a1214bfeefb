//! Simulated in-memory block storage for deterministic testing.
//!
//! This module provides an in-memory implementation of [`BlockStorage`]
//! with seeded fault injection:
//! - Block-level read/write errors
//! - A single write failure scheduled by count
//! - Sync failures

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::storage::{Block, BlockPointer, BlockStorage, StorageError};

/// Configuration for fault injection.
#[derive(Debug, Clone, Default)]
pub struct FaultConfig {
    /// Probability of a read error (0.0 - 1.0).
    pub read_error_rate: f64,
    /// Probability of a write error (0.0 - 1.0).
    pub write_error_rate: f64,
    /// Probability of a sync error (0.0 - 1.0).
    pub sync_error_rate: f64,
    /// Fail exactly the write whose 1-based number in
    /// [`SimulatedStorageStats::writes`] matches.
    pub fail_write_at: Option<u64>,
}

impl FaultConfig {
    /// Create a fault config with no faults (for baseline testing).
    #[must_use]
    pub fn no_faults() -> Self {
        Self::default()
    }

    /// Every write fails.
    #[must_use]
    pub const fn failing_writes() -> Self {
        Self {
            read_error_rate: 0.0,
            write_error_rate: 1.0,
            sync_error_rate: 0.0,
            fail_write_at: None,
        }
    }

    /// Every read fails.
    #[must_use]
    pub const fn failing_reads() -> Self {
        Self {
            read_error_rate: 1.0,
            write_error_rate: 0.0,
            sync_error_rate: 0.0,
            fail_write_at: None,
        }
    }

    /// Only the `n`th write fails. Pair with
    /// [`SimulatedStorage::reset_stats`] to count from a known point.
    #[must_use]
    pub const fn failing_write_at(n: u64) -> Self {
        Self {
            read_error_rate: 0.0,
            write_error_rate: 0.0,
            sync_error_rate: 0.0,
            fail_write_at: Some(n),
        }
    }
}

/// Statistics about simulated storage operations.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimulatedStorageStats {
    /// Number of block reads.
    pub reads: u64,
    /// Number of block writes.
    pub writes: u64,
    /// Number of syncs.
    pub syncs: u64,
    /// Number of injected read errors.
    pub injected_read_errors: u64,
    /// Number of injected write errors.
    pub injected_write_errors: u64,
    /// Number of injected sync errors.
    pub injected_sync_errors: u64,
}

/// In-memory block storage.
///
/// Blocks live in a map; a block that was never written but lies below the
/// highest written block reads back as a free (zeroed) block, matching the
/// hole-filling behavior of a real file.
pub struct SimulatedStorage {
    blocks: HashMap<BlockPointer, Block>,
    block_count: BlockPointer,
    fault_config: FaultConfig,
    rng: StdRng,
    stats: SimulatedStorageStats,
}

impl SimulatedStorage {
    /// Create an empty simulated storage with the given seed.
    ///
    /// The same seed produces the same sequence of faults.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, FaultConfig::default())
    }

    #[must_use]
    pub fn with_config(seed: u64, fault_config: FaultConfig) -> Self {
        Self {
            blocks: HashMap::new(),
            block_count: 0,
            fault_config,
            rng: StdRng::seed_from_u64(seed),
            stats: SimulatedStorageStats::default(),
        }
    }

    #[must_use]
    pub const fn stats(&self) -> &SimulatedStorageStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = SimulatedStorageStats::default();
    }

    pub fn set_fault_config(&mut self, config: FaultConfig) {
        self.fault_config = config;
    }

    /// Raw access to a stored block, bypassing fault injection and stats.
    #[must_use]
    pub fn peek(&self, pointer: BlockPointer) -> Option<&Block> {
        self.blocks.get(&pointer)
    }

    fn should_inject_fault(&mut self, rate: f64) -> bool {
        if rate <= 0.0 {
            return false;
        }
        self.rng.random::<f64>() < rate
    }
}

impl BlockStorage for SimulatedStorage {
    fn read_block(&mut self, pointer: BlockPointer) -> Result<Option<Block>, StorageError> {
        self.stats.reads += 1;

        if self.should_inject_fault(self.fault_config.read_error_rate) {
            self.stats.injected_read_errors += 1;
            return Err(StorageError::InjectedFault(format!(
                "simulated read error at block {pointer}"
            )));
        }

        if pointer >= self.block_count {
            return Ok(None);
        }
        Ok(Some(self.blocks.get(&pointer).cloned().unwrap_or_default()))
    }

    fn write_block(&mut self, pointer: BlockPointer, block: &Block) -> Result<(), StorageError> {
        self.stats.writes += 1;

        if self.fault_config.fail_write_at == Some(self.stats.writes)
            || self.should_inject_fault(self.fault_config.write_error_rate)
        {
            self.stats.injected_write_errors += 1;
            return Err(StorageError::InjectedFault(format!(
                "simulated write error at block {pointer}"
            )));
        }

        self.blocks.insert(pointer, block.clone());
        self.block_count = self.block_count.max(pointer + 1);
        Ok(())
    }

    fn block_count(&mut self) -> Result<BlockPointer, StorageError> {
        Ok(self.block_count)
    }

    fn sync(&mut self) -> Result<(), StorageError> {
        self.stats.syncs += 1;

        if self.should_inject_fault(self.fault_config.sync_error_rate) {
            self.stats.injected_sync_errors += 1;
            return Err(StorageError::InjectedFault(
                "simulated sync error".to_string(),
            ));
        }

        Ok(())
    }
}

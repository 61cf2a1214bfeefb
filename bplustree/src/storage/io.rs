//! Block storage abstraction.
//!
//! The tree talks to its backing store only through [`BlockStorage`], so the
//! same code runs against a real file in production and against
//! [`SimulatedStorage`](crate::simulation::SimulatedStorage) with injected
//! faults in tests.

use crate::storage::block::{Block, BlockPointer};

/// Errors that can occur during storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error.
    Io(std::io::Error),
    /// Injected fault for simulation.
    InjectedFault(String),
    /// The backing store holds more blocks than a block pointer can address.
    TooManyBlocks(u64),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InjectedFault(msg) => write!(f, "injected fault: {msg}"),
            Self::TooManyBlocks(count) => {
                write!(f, "{count} blocks exceed the addressable block range")
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::InjectedFault(_) | Self::TooManyBlocks(_) => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Abstraction over block-addressed storage.
///
/// Implementations must ensure:
/// - `read_block` returns the last written content for a block
/// - `read_block` returns `None` for a block lying past the end of storage
/// - writing past the end extends the storage; any gap reads back as free blocks
pub trait BlockStorage {
    /// Read one block.
    fn read_block(&mut self, pointer: BlockPointer) -> Result<Option<Block>, StorageError>;

    /// Write one block.
    fn write_block(&mut self, pointer: BlockPointer, block: &Block) -> Result<(), StorageError>;

    /// Number of whole blocks currently held.
    fn block_count(&mut self) -> Result<BlockPointer, StorageError>;

    /// Make all previous writes durable.
    fn sync(&mut self) -> Result<(), StorageError>;
}

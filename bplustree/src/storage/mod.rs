//! Block storage for the index file.
//!
//! # File Format
//!
//! The index is a single file of fixed 1024-byte blocks:
//!
//! - Block 0: the current root node
//! - Remaining blocks: leaf and internal nodes, in allocation order
//!
//! Each block starts with a liveness byte and a node-kind byte, followed by
//! the node payload and zero padding. See [`block`] for the layout.

mod allocator;
pub mod block;
mod file;
mod io;

pub use allocator::BlockAllocator;
pub use block::{
    BLOCK_HEADER_SIZE, BLOCK_SIZE, BLOCK_SIZE_U64, Block, BlockKind, BlockPointer,
    HEADER_OVERHEAD, POINTER_SIZE, ROOT_BLOCK,
};
pub use file::BlockFile;
pub use io::{BlockStorage, StorageError};

//! Monotonic block allocator.
//!
//! Blocks are handed out in increasing order and never reused, even after the
//! entries they held are deleted. The only step backwards is [`unreserve`],
//! used when a freshly allocated node is forced onto the root block instead.
//!
//! [`unreserve`]: BlockAllocator::unreserve

use crate::storage::block::BlockPointer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockAllocator {
    next_free: BlockPointer,
}

impl BlockAllocator {
    /// Start allocating after the `block_count` blocks already in the file.
    #[must_use]
    pub const fn new(block_count: BlockPointer) -> Self {
        Self {
            next_free: block_count,
        }
    }

    /// Hand out the next free block.
    pub const fn allocate(&mut self) -> BlockPointer {
        let pointer = self.next_free;
        self.next_free += 1;
        pointer
    }

    /// Give back the most recently allocated block.
    ///
    /// Never drops below 1: block 0 is the root and stays reserved once taken.
    pub const fn unreserve(&mut self) {
        if self.next_free > 1 {
            self.next_free -= 1;
        }
    }

    /// The block the next call to [`allocate`](Self::allocate) returns.
    #[must_use]
    pub const fn next_free(&self) -> BlockPointer {
        self.next_free
    }
}

//! Shared state handed to every node operation.

use crate::btree::node::{Node, NodeError};
use crate::schema::{KeySpec, TableSpec};
use crate::storage::{BlockAllocator, BlockPointer, BlockStorage};

/// Deepest level a descent may reach, counting the root as level 1.
///
/// Every internal node has at least two children and block pointers are
/// 32 bits, so a well-formed tree can't be taller than this.
pub const MAX_HEIGHT: usize = BlockPointer::BITS as usize + 1;

/// Everything a node needs beyond its own contents: block I/O, allocation,
/// the schema for its codecs, and the capacity limits that trigger splits.
///
/// Nodes borrow this for the duration of one operation instead of holding
/// a reference back to the tree.
pub struct TreeContext<S> {
    pub(crate) storage: S,
    pub(crate) allocator: BlockAllocator,
    pub(crate) table: TableSpec,
    pub(crate) key_spec: KeySpec,
    pub(crate) max_leaf_entries: usize,
    pub(crate) max_internal_keys: usize,
}

impl<S: BlockStorage> TreeContext<S> {
    /// Load the node stored at `pointer`.
    pub fn read_node(&mut self, pointer: BlockPointer) -> Result<Node, NodeError> {
        let block = self
            .storage
            .read_block(pointer)?
            .ok_or(NodeError::DeadBlock(pointer))?;
        tracing::trace!(pointer, "read block");
        Node::decode(pointer, &block, &self.table, &self.key_spec)
    }

    /// Load the child met at `depth` levels below the root, counting the root
    /// as level 1. A descent past [`MAX_HEIGHT`] means the pointers form a cycle.
    pub fn read_child(&mut self, pointer: BlockPointer, depth: usize) -> Result<Node, NodeError> {
        if depth > MAX_HEIGHT {
            return Err(NodeError::TooDeep { pointer, depth });
        }
        self.read_node(pointer)
    }

    /// Persist a node at its own block pointer.
    pub fn write_node(&mut self, node: &Node) -> Result<(), NodeError> {
        let block = node.encode(&self.table, &self.key_spec)?;
        self.storage.write_block(node.pointer(), &block)?;
        tracing::trace!(pointer = node.pointer(), "wrote block");
        Ok(())
    }
}

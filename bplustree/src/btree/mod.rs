//! Disk-backed B+ tree.
//!
//! [`BPlusTree`] is the public handle. Nodes are loaded from storage one
//! descent step at a time and written back before the step returns; the
//! root stays cached in the handle.

mod comparator;
mod context;
mod node;
mod tree;

pub use comparator::compare_keys;
pub use context::{MAX_HEIGHT, TreeContext};
pub use node::{
    InsertOutcome, InternalNode, LeafNode, Node, NodeBody, NodeBounds, NodeError, Promotion,
};
pub use tree::{BPlusTree, TreeError};

//! B+ tree node types, serialization and the recursive algorithms.
//!
//! A node is the in-memory image of one block:
//! - Leaf nodes: sorted keys with their full records, plus a forward sibling pointer
//! - Internal nodes: sorted separator keys and one more child pointer than keys
//!
//! `children[i]` holds keys `k` with `keys[i-1] <= k < keys[i]`; a key equal
//! to a separator routes right.

use std::fmt;

use crate::btree::comparator::compare_keys;
use crate::btree::context::TreeContext;
use crate::codec::{ByteReader, CodecError, KeyCodec, RecordCodec, put_u32};
use crate::schema::{Key, KeySpec, Record, TableSpec, Value, format_tuple};
use crate::storage::{
    BLOCK_HEADER_SIZE, BLOCK_SIZE, Block, BlockAllocator, BlockKind, BlockPointer, BlockStorage,
    ROOT_BLOCK, StorageError,
};

/// The separator and pointer pair a split hands to its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    pub key: Key,
    pub left: BlockPointer,
    pub right: BlockPointer,
}

/// Result of inserting into a subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    NoSplit,
    Split(Promotion),
}

/// Key range a child must respect; `None` is unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeBounds {
    pub pointer: BlockPointer,
    pub low: Option<Key>,
    pub high: Option<Key>,
}

/// A leaf: records sorted by key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeafNode {
    /// Keys in sorted order, one per record.
    pub keys: Vec<Key>,
    pub records: Vec<Record>,
    /// Block of the next leaf to the right, 0 if none. Persisted only.
    pub next_sibling: BlockPointer,
}

impl LeafNode {
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Find the index where a key should be inserted (or exists).
    pub fn find_index(&self, key: &[Value]) -> Result<usize, usize> {
        self.keys.binary_search_by(|k| compare_keys(k, key))
    }

    #[must_use]
    pub fn get(&self, key: &[Value]) -> Option<&Record> {
        self.find_index(key).ok().map(|i| &self.records[i])
    }

    /// Insert or overwrite an entry.
    ///
    /// Returns the replaced record if the key was already present.
    pub fn upsert(&mut self, key: Key, record: Record) -> Option<Record> {
        match self.find_index(&key) {
            Ok(i) => Some(std::mem::replace(&mut self.records[i], record)),
            Err(i) => {
                self.keys.insert(i, key);
                self.records.insert(i, record);
                None
            }
        }
    }

    pub fn remove(&mut self, key: &[Value]) -> Option<Record> {
        let i = self.find_index(key).ok()?;
        self.keys.remove(i);
        Some(self.records.remove(i))
    }

    /// Copy the entries from `at` onward into a new leaf.
    ///
    /// The new leaf takes over this leaf's sibling pointer. This leaf is left
    /// untouched until [`truncate`](Self::truncate) once the copy is stored.
    #[must_use]
    pub fn upper_half(&self, at: usize) -> Self {
        Self {
            keys: self.keys[at..].to_vec(),
            records: self.records[at..].to_vec(),
            next_sibling: self.next_sibling,
        }
    }

    pub fn truncate(&mut self, len: usize) {
        self.keys.truncate(len);
        self.records.truncate(len);
    }
}

/// An internal node: N separator keys and N+1 child pointers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InternalNode {
    pub keys: Vec<Key>,
    pub children: Vec<BlockPointer>,
}

impl InternalNode {
    #[must_use]
    pub fn with_children(left: BlockPointer, key: Key, right: BlockPointer) -> Self {
        Self {
            keys: vec![key],
            children: vec![left, right],
        }
    }

    /// Index of the first separator strictly greater than `key`, or the last
    /// child if there is none.
    #[must_use]
    pub fn child_index(&self, key: &[Value]) -> usize {
        self.keys.partition_point(|k| compare_keys(k, key).is_le())
    }

    #[must_use]
    pub fn child_for(&self, key: &[Value]) -> BlockPointer {
        self.children[self.child_index(key)]
    }

    /// Fold a promoted separator and its right pointer into this node.
    ///
    /// An existing equal separator keeps its place and gets the new right pointer.
    pub fn insert_separator(&mut self, key: Key, right: BlockPointer) {
        match self.keys.binary_search_by(|k| compare_keys(k, &key)) {
            Ok(i) => self.children[i + 1] = right,
            Err(i) => {
                self.keys.insert(i, key);
                self.children.insert(i + 1, right);
            }
        }
    }

    /// The promoted key and right node of a split around `mid`.
    ///
    /// Keys and children after `mid` go right; the key at `mid` moves up and
    /// stays in neither node. This node keeps its contents until
    /// [`truncate`](Self::truncate).
    #[must_use]
    pub fn upper_half(&self, mid: usize) -> (Key, Self) {
        (
            self.keys[mid].clone(),
            Self {
                keys: self.keys[mid + 1..].to_vec(),
                children: self.children[mid + 1..].to_vec(),
            },
        )
    }

    /// Keep the first `keys` separators and the children between them.
    pub fn truncate(&mut self, keys: usize) {
        self.keys.truncate(keys);
        self.children.truncate(keys + 1);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeBody {
    Leaf(LeafNode),
    Internal(InternalNode),
}

/// A node bound to its block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pointer: BlockPointer,
    is_root: bool,
    body: NodeBody,
}

impl Node {
    #[must_use]
    pub const fn leaf(pointer: BlockPointer, leaf: LeafNode) -> Self {
        Self {
            pointer,
            is_root: pointer == ROOT_BLOCK,
            body: NodeBody::Leaf(leaf),
        }
    }

    #[must_use]
    pub const fn internal(pointer: BlockPointer, internal: InternalNode) -> Self {
        Self {
            pointer,
            is_root: pointer == ROOT_BLOCK,
            body: NodeBody::Internal(internal),
        }
    }

    #[must_use]
    pub const fn pointer(&self) -> BlockPointer {
        self.pointer
    }

    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.is_root
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self.body, NodeBody::Leaf(_))
    }

    #[must_use]
    pub const fn body(&self) -> &NodeBody {
        &self.body
    }

    #[must_use]
    pub fn keys(&self) -> &[Key] {
        match &self.body {
            NodeBody::Leaf(leaf) => &leaf.keys,
            NodeBody::Internal(internal) => &internal.keys,
        }
    }

    /// Child pointers; empty for a leaf.
    #[must_use]
    pub fn children(&self) -> &[BlockPointer] {
        match &self.body {
            NodeBody::Leaf(_) => &[],
            NodeBody::Internal(internal) => &internal.children,
        }
    }

    const fn kind(&self) -> BlockKind {
        match self.body {
            NodeBody::Leaf(_) => BlockKind::Leaf,
            NodeBody::Internal(_) => BlockKind::Internal,
        }
    }

    /// Move this node onto the root block.
    ///
    /// The node was given a fresh block when it was created; that block is
    /// handed back to the allocator.
    pub const fn make_root(&mut self, allocator: &mut BlockAllocator) {
        self.pointer = ROOT_BLOCK;
        self.is_root = true;
        allocator.unreserve();
    }

    /// Move a former root to its own block.
    pub const fn relocate(&mut self, pointer: BlockPointer) {
        self.pointer = pointer;
        self.is_root = false;
    }

    /// Replace this node's contents with a single separator over two children.
    pub fn link_children(&mut self, left: BlockPointer, key: Key, right: BlockPointer) {
        self.body = NodeBody::Internal(InternalNode::with_children(left, key, right));
    }

    /// Look up the record stored under `key` in this subtree.
    pub fn find<S: BlockStorage>(
        &self,
        ctx: &mut TreeContext<S>,
        key: &[Value],
    ) -> Result<Option<Record>, NodeError> {
        self.find_at(ctx, key, 1)
    }

    fn find_at<S: BlockStorage>(
        &self,
        ctx: &mut TreeContext<S>,
        key: &[Value],
        depth: usize,
    ) -> Result<Option<Record>, NodeError> {
        match &self.body {
            NodeBody::Leaf(leaf) => Ok(leaf.get(key).cloned()),
            NodeBody::Internal(internal) => {
                let child = ctx.read_child(internal.child_for(key), depth + 1)?;
                child.find_at(ctx, key, depth + 1)
            }
        }
    }

    /// Insert a record into this subtree.
    ///
    /// Children touched on the way down are written back here; this node
    /// itself is left for the caller to write. A split reports the promoted
    /// separator for the caller to fold in.
    pub fn insert<S: BlockStorage>(
        &mut self,
        ctx: &mut TreeContext<S>,
        record: Record,
    ) -> Result<InsertOutcome, NodeError> {
        let key = ctx.key_spec.key_of(&record);
        self.insert_entry(ctx, key, record, 1)
    }

    fn insert_entry<S: BlockStorage>(
        &mut self,
        ctx: &mut TreeContext<S>,
        key: Key,
        record: Record,
        depth: usize,
    ) -> Result<InsertOutcome, NodeError> {
        let pointer = self.pointer;
        match &mut self.body {
            NodeBody::Leaf(leaf) => {
                leaf.upsert(key, record);
                if leaf.len() <= ctx.max_leaf_entries {
                    return Ok(InsertOutcome::NoSplit);
                }

                let at = ctx.max_leaf_entries / 2;
                let sibling_pointer = ctx.allocator.allocate();
                let sibling = leaf.upper_half(at);
                let promoted = sibling.keys[0].clone();
                tracing::debug!(
                    pointer,
                    sibling = sibling_pointer,
                    kept = at,
                    moved = sibling.len(),
                    "split leaf"
                );

                ctx.write_node(&Self::leaf(sibling_pointer, sibling))?;
                leaf.truncate(at);
                leaf.next_sibling = sibling_pointer;
                Ok(InsertOutcome::Split(Promotion {
                    key: promoted,
                    left: pointer,
                    right: sibling_pointer,
                }))
            }
            NodeBody::Internal(internal) => {
                let mut child = ctx.read_child(internal.child_for(&key), depth + 1)?;
                let outcome = child.insert_entry(ctx, key, record, depth + 1)?;
                ctx.write_node(&child)?;

                match outcome {
                    InsertOutcome::NoSplit => Ok(InsertOutcome::NoSplit),
                    InsertOutcome::Split(promotion) => self.insert_promotion(ctx, promotion),
                }
            }
        }
    }

    /// Fold a child's promotion into this internal node, splitting it in turn
    /// if it overflows.
    pub fn insert_promotion<S: BlockStorage>(
        &mut self,
        ctx: &mut TreeContext<S>,
        promotion: Promotion,
    ) -> Result<InsertOutcome, NodeError> {
        let pointer = self.pointer;
        let NodeBody::Internal(internal) = &mut self.body else {
            return Err(NodeError::PromotionIntoLeaf(pointer));
        };

        internal.insert_separator(promotion.key, promotion.right);
        if internal.keys.len() <= ctx.max_internal_keys {
            return Ok(InsertOutcome::NoSplit);
        }

        let mid = ctx.max_internal_keys / 2;
        let sibling_pointer = ctx.allocator.allocate();
        let (promoted, sibling) = internal.upper_half(mid);
        tracing::debug!(
            pointer,
            sibling = sibling_pointer,
            kept = mid,
            moved = sibling.keys.len(),
            "split internal node"
        );

        ctx.write_node(&Self::internal(sibling_pointer, sibling))?;
        internal.truncate(mid);
        Ok(InsertOutcome::Split(Promotion {
            key: promoted,
            left: pointer,
            right: sibling_pointer,
        }))
    }

    /// Remove `key` from this subtree, returning its record if it was present.
    ///
    /// Nodes are never merged or rebalanced; a leaf may end up under-full or empty.
    pub fn delete<S: BlockStorage>(
        &mut self,
        ctx: &mut TreeContext<S>,
        key: &[Value],
    ) -> Result<Option<Record>, NodeError> {
        self.delete_at(ctx, key, 1)
    }

    fn delete_at<S: BlockStorage>(
        &mut self,
        ctx: &mut TreeContext<S>,
        key: &[Value],
        depth: usize,
    ) -> Result<Option<Record>, NodeError> {
        match &mut self.body {
            NodeBody::Leaf(leaf) => Ok(leaf.remove(key)),
            NodeBody::Internal(internal) => {
                let mut child = ctx.read_child(internal.child_for(key), depth + 1)?;
                let removed = child.delete_at(ctx, key, depth + 1)?;
                ctx.write_node(&child)?;
                Ok(removed)
            }
        }
    }

    /// Check that every key lies in `low..=high` and that keys strictly increase.
    #[must_use]
    pub fn is_within(&self, low: Option<&Key>, high: Option<&Key>) -> bool {
        let keys = self.keys();
        let bounded = keys.iter().all(|key| {
            low.is_none_or(|low| compare_keys(low, key).is_le())
                && high.is_none_or(|high| compare_keys(key, high).is_le())
        });
        bounded && keys.windows(2).all(|pair| compare_keys(&pair[0], &pair[1]).is_lt())
    }

    /// Bounds for each child, given this node's own bounds.
    #[must_use]
    pub fn child_bounds(&self, low: Option<&Key>, high: Option<&Key>) -> Vec<NodeBounds> {
        let NodeBody::Internal(internal) = &self.body else {
            return Vec::new();
        };

        internal
            .children
            .iter()
            .enumerate()
            .map(|(i, &pointer)| NodeBounds {
                pointer,
                low: if i == 0 {
                    low.cloned()
                } else {
                    internal.keys.get(i - 1).cloned()
                },
                high: internal.keys.get(i).cloned().or_else(|| high.cloned()),
            })
            .collect()
    }

    /// Serialize into a framed block.
    pub fn encode(&self, table: &TableSpec, key_spec: &KeySpec) -> Result<Block, NodeError> {
        let mut payload = Vec::with_capacity(BLOCK_SIZE);
        match &self.body {
            NodeBody::Leaf(leaf) => {
                let codec = RecordCodec::new(table);
                put_u32(&mut payload, count(leaf.records.len()));
                for record in &leaf.records {
                    codec.write(record, &mut payload)?;
                }
                put_u32(&mut payload, leaf.next_sibling);
            }
            NodeBody::Internal(internal) => {
                let codec = KeyCodec::new(key_spec);
                put_u32(&mut payload, count(internal.keys.len()));
                for key in &internal.keys {
                    codec.write(key, &mut payload)?;
                }
                put_u32(&mut payload, count(internal.children.len()));
                for &child in &internal.children {
                    put_u32(&mut payload, child);
                }
            }
        }

        Block::frame(self.kind(), &payload).ok_or(NodeError::BlockOverflow {
            pointer: self.pointer,
            size: BLOCK_HEADER_SIZE + payload.len(),
        })
    }

    /// Deserialize the node stored in `block`.
    pub fn decode(
        pointer: BlockPointer,
        block: &Block,
        table: &TableSpec,
        key_spec: &KeySpec,
    ) -> Result<Self, NodeError> {
        if !block.is_live() {
            return Err(NodeError::DeadBlock(pointer));
        }
        let kind = BlockKind::try_from(block.kind_byte())
            .map_err(|kind| NodeError::InvalidKind { pointer, kind })?;

        let mut reader = ByteReader::new(block.payload());
        match kind {
            BlockKind::Leaf => {
                let codec = RecordCodec::new(table);
                let entries = reader.read_u32()? as usize;
                let mut leaf = LeafNode {
                    keys: Vec::with_capacity(entries.min(BLOCK_SIZE)),
                    records: Vec::with_capacity(entries.min(BLOCK_SIZE)),
                    next_sibling: 0,
                };
                for _ in 0..entries {
                    let record = codec.read(&mut reader)?;
                    leaf.keys.push(key_spec.key_of(&record));
                    leaf.records.push(record);
                }
                leaf.next_sibling = reader.read_u32()?;
                Ok(Self::leaf(pointer, leaf))
            }
            BlockKind::Internal => {
                let codec = KeyCodec::new(key_spec);
                let key_count = reader.read_u32()? as usize;
                let mut internal = InternalNode {
                    keys: Vec::with_capacity(key_count.min(BLOCK_SIZE)),
                    children: Vec::new(),
                };
                for _ in 0..key_count {
                    internal.keys.push(codec.read(&mut reader)?);
                }
                let child_count = reader.read_u32()? as usize;
                if child_count != key_count + 1 {
                    return Err(NodeError::MalformedChildren {
                        pointer,
                        keys: key_count,
                        children: child_count,
                    });
                }
                internal.children.reserve(child_count);
                for _ in 0..child_count {
                    internal.children.push(reader.read_u32()?);
                }
                Ok(Self::internal(pointer, internal))
            }
        }
    }
}

/// Entry counts are bounded by node capacity; an absurd count saturates and
/// the framing check then rejects the block.
fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = if self.is_root { "root " } else { "" };
        match &self.body {
            NodeBody::Leaf(leaf) => {
                writeln!(f, "---- block {} ({role}leaf, {} records)", self.pointer, leaf.len())?;
                let records: Vec<String> = leaf.records.iter().map(|r| format_tuple(r)).collect();
                writeln!(f, "records: {}", records.join(", "))?;
                writeln!(f, "next sibling: {}", leaf.next_sibling)
            }
            NodeBody::Internal(internal) => {
                writeln!(
                    f,
                    "---- block {} ({role}internal, {} keys)",
                    self.pointer,
                    internal.keys.len()
                )?;
                let keys: Vec<String> = internal.keys.iter().map(|k| format_tuple(k)).collect();
                writeln!(f, "keys: {}", keys.join(", "))?;
                let children: Vec<String> =
                    internal.children.iter().map(ToString::to_string).collect();
                writeln!(f, "children: {}", children.join(", "))
            }
        }
    }
}

/// Errors that can occur when working with B+ tree nodes.
#[derive(Debug)]
pub enum NodeError {
    /// Block I/O failed.
    Storage(StorageError),
    /// A tuple could not be encoded or decoded.
    Codec(CodecError),
    /// A descent reached a block that holds no live node.
    DeadBlock(BlockPointer),
    /// The kind byte is neither leaf nor internal.
    InvalidKind { pointer: BlockPointer, kind: u8 },
    /// An internal node's child count is not its key count plus one.
    MalformedChildren {
        pointer: BlockPointer,
        keys: usize,
        children: usize,
    },
    /// The serialized node does not fit in one block.
    BlockOverflow { pointer: BlockPointer, size: usize },
    /// A split promotion was handed to a leaf.
    PromotionIntoLeaf(BlockPointer),
    /// A descent went deeper than any well-formed tree can be.
    TooDeep { pointer: BlockPointer, depth: usize },
    /// A traversal reached the same block twice.
    Revisited(BlockPointer),
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage error: {e}"),
            Self::Codec(e) => write!(f, "codec error: {e}"),
            Self::DeadBlock(pointer) => write!(f, "block {pointer} holds no live node"),
            Self::InvalidKind { pointer, kind } => write!(
                f,
                "block {pointer} has kind byte {kind}, expected 0 (internal) or 1 (leaf)"
            ),
            Self::MalformedChildren {
                pointer,
                keys,
                children,
            } => write!(
                f,
                "internal block {pointer} has {keys} keys but {children} children"
            ),
            Self::BlockOverflow { pointer, size } => write!(
                f,
                "node for block {pointer} serializes to {size} bytes, block size is {BLOCK_SIZE}"
            ),
            Self::PromotionIntoLeaf(pointer) => {
                write!(f, "promotion applies only to internal nodes, block {pointer} is a leaf")
            }
            Self::TooDeep { pointer, depth } => write!(
                f,
                "block {pointer} sits at depth {depth}, child pointers must form a cycle"
            ),
            Self::Revisited(pointer) => {
                write!(f, "block {pointer} is reachable along more than one path")
            }
        }
    }
}

impl std::error::Error for NodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(e) => Some(e),
            Self::Codec(e) => Some(e),
            Self::DeadBlock(_)
            | Self::InvalidKind { .. }
            | Self::MalformedChildren { .. }
            | Self::BlockOverflow { .. }
            | Self::PromotionIntoLeaf(_)
            | Self::TooDeep { .. }
            | Self::Revisited(_) => None,
        }
    }
}

impl From<StorageError> for NodeError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<CodecError> for NodeError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

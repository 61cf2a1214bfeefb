//! The B+ tree handle.
//!
//! The tree owns the block storage, the allocator and the root node. The
//! root is kept in memory and always lives at block 0; every other node is
//! loaded for one descent step and dropped after its write-back. A failed
//! insert or delete drops the cached root, and the next call reloads it from
//! block 0 so memory never runs ahead of the file.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::btree::context::TreeContext;
use crate::btree::node::{InsertOutcome, InternalNode, LeafNode, Node, NodeError, Promotion};
use crate::codec::{CodecError, KeyCodec, RecordCodec};
use crate::config::{ConfigError, MIN_CAPACITY, TreeConfig};
use crate::schema::{KeySpec, Record, SchemaError, TableSpec, Value};
use crate::storage::{
    BLOCK_SIZE, BlockAllocator, BlockFile, BlockPointer, BlockStorage, HEADER_OVERHEAD,
    POINTER_SIZE, ROOT_BLOCK, StorageError,
};

/// A disk-backed B+ tree mapping composite keys to records.
pub struct BPlusTree<S: BlockStorage = BlockFile> {
    ctx: TreeContext<S>,
    root: Option<Node>,
    /// Set when an operation failed part way; `root` must be reloaded.
    root_stale: bool,
}

impl BPlusTree<BlockFile> {
    /// Create or open the index file `store_dir/filename`.
    ///
    /// An empty `store_dir` uses `filename` as given. The directory is
    /// created if it does not exist.
    pub fn create<K: AsRef<str>>(
        store_dir: impl AsRef<Path>,
        filename: impl AsRef<Path>,
        key_fields: &[K],
        table: TableSpec,
    ) -> Result<Self, TreeError> {
        let config = TreeConfig::new(store_dir.as_ref());
        Self::open(&config, filename, key_fields, table)
    }

    /// Open an index file under the configured store directory.
    pub fn open<K: AsRef<str>>(
        config: &TreeConfig,
        filename: impl AsRef<Path>,
        key_fields: &[K],
        table: TableSpec,
    ) -> Result<Self, TreeError> {
        let key_spec = KeySpec::new(key_fields, &table)?;
        let path = index_path(&config.store_directory, filename.as_ref())?;
        let storage = BlockFile::open_or_create(&path)?;
        tracing::info!(path = %path.display(), "opening index file");
        Self::with_storage(storage, key_spec, table, config)
    }

    /// Path of the index file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.ctx.storage.path()
    }
}

impl<S: BlockStorage> BPlusTree<S> {
    /// Build a tree over existing block storage.
    ///
    /// A live block 0 is loaded as the root; otherwise the tree starts empty.
    pub fn with_storage(
        mut storage: S,
        key_spec: KeySpec,
        table: TableSpec,
        config: &TreeConfig,
    ) -> Result<Self, TreeError> {
        let (max_leaf_entries, max_internal_keys) = capacities(&table, &key_spec, config)?;
        let block_count = storage.block_count()?;

        let root = load_root(&mut storage, &table, &key_spec)?;
        if root.is_none() && block_count > 0 {
            tracing::warn!(block_count, "root block is not live, starting with an empty tree");
        }

        tracing::info!(
            block_count,
            max_leaf_entries,
            max_internal_keys,
            has_root = root.is_some(),
            "opened tree"
        );

        Ok(Self {
            ctx: TreeContext {
                storage,
                allocator: BlockAllocator::new(block_count),
                table,
                key_spec,
                max_leaf_entries,
                max_internal_keys,
            },
            root,
            root_stale: false,
        })
    }

    /// Insert a record, replacing any record stored under the same key.
    ///
    /// On error the blocks written so far stay on disk and the cached root is
    /// reloaded from block 0 by the next call.
    pub fn insert(&mut self, record: Record) -> Result<(), TreeError> {
        RecordCodec::new(&self.ctx.table).validate(&record)?;
        self.refresh_root()?;

        let root = self
            .root
            .get_or_insert_with(|| empty_root(&mut self.ctx.allocator));

        let result = root
            .insert(&mut self.ctx, record)
            .and_then(|outcome| match outcome {
                InsertOutcome::NoSplit => self.ctx.write_node(root),
                InsertOutcome::Split(promotion) => grow_root(&mut self.ctx, root, promotion),
            });
        if let Err(e) = result {
            self.mark_root_stale(&e);
            return Err(e.into());
        }
        Ok(())
    }

    /// Look up the record stored under `key`.
    pub fn find(&mut self, key: &[Value]) -> Result<Option<Record>, TreeError> {
        KeyCodec::new(&self.ctx.key_spec).validate(key)?;
        self.refresh_root()?;
        match &self.root {
            Some(root) => Ok(root.find(&mut self.ctx, key)?),
            None => Ok(None),
        }
    }

    /// Remove the record stored under `key`, returning it if it was present.
    ///
    /// Nodes are not rebalanced; an absent key is a no-op.
    pub fn delete(&mut self, key: &[Value]) -> Result<Option<Record>, TreeError> {
        KeyCodec::new(&self.ctx.key_spec).validate(key)?;
        self.refresh_root()?;
        let Some(root) = self.root.as_mut() else {
            return Ok(None);
        };

        let result = root.delete(&mut self.ctx, key).and_then(|removed| {
            if removed.is_some() && root.is_leaf() {
                self.ctx.write_node(root)?;
            }
            Ok(removed)
        });
        result.map_err(|e| {
            self.mark_root_stale(&e);
            e.into()
        })
    }

    /// Check every node's keys against the bounds implied by its ancestors.
    ///
    /// Traverses breadth first and stops at the first violation.
    /// A block reached twice is an error, as is any storage or decode failure.
    pub fn is_tree_valid(&mut self) -> Result<bool, TreeError> {
        self.refresh_root()?;
        let Some(root) = &self.root else {
            return Ok(true);
        };
        if !root.is_within(None, None) {
            tracing::debug!(pointer = root.pointer(), "root keys out of order");
            return Ok(false);
        }

        let mut visited = HashSet::from([ROOT_BLOCK]);
        let mut queue: VecDeque<_> = root.child_bounds(None, None).into();
        while let Some(bounds) = queue.pop_front() {
            if !visited.insert(bounds.pointer) {
                return Err(NodeError::Revisited(bounds.pointer).into());
            }
            let node = self.ctx.read_node(bounds.pointer)?;
            if !node.is_within(bounds.low.as_ref(), bounds.high.as_ref()) {
                tracing::debug!(
                    pointer = bounds.pointer,
                    low = ?bounds.low,
                    high = ?bounds.high,
                    "node violates its bounds"
                );
                return Ok(false);
            }
            queue.extend(node.child_bounds(bounds.low.as_ref(), bounds.high.as_ref()));
        }
        Ok(true)
    }

    /// Number of levels; 0 for an empty tree.
    pub fn height(&mut self) -> Result<usize, TreeError> {
        self.refresh_root()?;
        let Some(root) = &self.root else {
            return Ok(0);
        };

        let mut height = 1;
        let mut next = root.children().first().copied();
        while let Some(pointer) = next {
            height += 1;
            let node = self.ctx.read_child(pointer, height)?;
            next = node.children().first().copied();
        }
        Ok(height)
    }

    /// Dump every node to stdout, breadth first.
    pub fn print_tree(&mut self) -> Result<(), TreeError> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.write_tree(&mut out)
    }

    /// Dump every node to `out`, breadth first.
    pub fn write_tree<W: io::Write>(&mut self, out: &mut W) -> Result<(), TreeError> {
        self.refresh_root()?;
        let Some(root) = &self.root else {
            writeln!(out, "(empty tree)")?;
            return Ok(());
        };

        write!(out, "{root}")?;
        let mut visited = HashSet::from([ROOT_BLOCK]);
        let mut queue: VecDeque<BlockPointer> = root.children().iter().copied().collect();
        while let Some(pointer) = queue.pop_front() {
            if !visited.insert(pointer) {
                return Err(NodeError::Revisited(pointer).into());
            }
            let node = self.ctx.read_node(pointer)?;
            write!(out, "{node}")?;
            queue.extend(node.children());
        }
        Ok(())
    }

    #[must_use]
    pub const fn max_leaf_entries(&self) -> usize {
        self.ctx.max_leaf_entries
    }

    #[must_use]
    pub const fn max_internal_keys(&self) -> usize {
        self.ctx.max_internal_keys
    }

    /// The block the next new node will take.
    #[must_use]
    pub const fn next_free_block(&self) -> BlockPointer {
        self.ctx.allocator.next_free()
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.ctx.storage
    }

    #[allow(clippy::missing_const_for_fn)] // mutable references can't be const
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.ctx.storage
    }

    /// Sync and release the storage.
    pub fn close(mut self) -> Result<(), TreeError> {
        self.ctx.storage.sync()?;
        tracing::debug!(next_free_block = self.ctx.allocator.next_free(), "closed tree");
        Ok(())
    }

    /// Sync and hand back the storage, e.g. to reopen it.
    pub fn into_storage(mut self) -> Result<S, TreeError> {
        self.ctx.storage.sync()?;
        Ok(self.ctx.storage)
    }

    fn mark_root_stale(&mut self, error: &NodeError) {
        tracing::warn!(%error, "operation failed, dropping the cached root");
        self.root = None;
        self.root_stale = true;
    }

    /// Reload the root from block 0 after a failed operation.
    ///
    /// The tree stays stale if the reload fails, so it is never mistaken for
    /// an empty one.
    fn refresh_root(&mut self) -> Result<(), TreeError> {
        if !self.root_stale {
            return Ok(());
        }
        self.root = load_root(&mut self.ctx.storage, &self.ctx.table, &self.ctx.key_spec)?;
        self.root_stale = false;
        tracing::debug!(has_root = self.root.is_some(), "reloaded root");
        Ok(())
    }
}

/// The node on block 0, if that block is live.
fn load_root<S: BlockStorage>(
    storage: &mut S,
    table: &TableSpec,
    key_spec: &KeySpec,
) -> Result<Option<Node>, NodeError> {
    match storage.read_block(ROOT_BLOCK)? {
        Some(block) if block.is_live() => {
            Ok(Some(Node::decode(ROOT_BLOCK, &block, table, key_spec)?))
        }
        _ => Ok(None),
    }
}

/// The first node of an empty tree: a leaf on block 0.
fn empty_root(allocator: &mut BlockAllocator) -> Node {
    let mut root = Node::leaf(allocator.allocate(), LeafNode::default());
    if root.pointer() != ROOT_BLOCK {
        root.make_root(allocator);
    }
    root
}

/// Replace a split root with a new internal root over both halves.
///
/// A copy of the old root moves to a fresh block so the new root can take
/// block 0. `root` is only replaced once both blocks are written.
fn grow_root<S: BlockStorage>(
    ctx: &mut TreeContext<S>,
    root: &mut Node,
    promotion: Promotion,
) -> Result<(), NodeError> {
    let mut new_root = Node::internal(ctx.allocator.allocate(), InternalNode::default());
    new_root.make_root(&mut ctx.allocator);

    let relocated = ctx.allocator.allocate();
    let mut moved = root.clone();
    moved.relocate(relocated);
    ctx.write_node(&moved)?;

    new_root.link_children(relocated, promotion.key, promotion.right);
    ctx.write_node(&new_root)?;
    *root = new_root;

    tracing::debug!(relocated, right = promotion.right, "grew root");
    Ok(())
}

/// Node capacities from the worst-case encoded widths, clamped by config.
fn capacities(
    table: &TableSpec,
    key_spec: &KeySpec,
    config: &TreeConfig,
) -> Result<(usize, usize), TreeError> {
    let usable = BLOCK_SIZE - HEADER_OVERHEAD;

    let record_size = table.max_record_size();
    let leaf = usable / record_size;
    if leaf < MIN_CAPACITY {
        return Err(SchemaError::TooWide {
            what: "record",
            size: record_size,
        }
        .into());
    }

    let entry_size = key_spec.max_key_size() + POINTER_SIZE;
    let internal = usable / entry_size;
    if internal < MIN_CAPACITY {
        return Err(SchemaError::TooWide {
            what: "key",
            size: key_spec.max_key_size(),
        }
        .into());
    }

    Ok((
        TreeConfig::effective_capacity("max_leaf_entries", leaf, config.max_leaf_entries)?,
        TreeConfig::effective_capacity("max_internal_keys", internal, config.max_internal_keys)?,
    ))
}

fn index_path(store_directory: &Path, filename: &Path) -> Result<PathBuf, TreeError> {
    if store_directory.as_os_str().is_empty() {
        return Ok(filename.to_path_buf());
    }
    std::fs::create_dir_all(store_directory)?;
    Ok(store_directory.join(filename))
}

/// Errors that can occur during tree operations.
#[derive(Debug)]
pub enum TreeError {
    /// The schema or key declaration is invalid.
    Schema(SchemaError),
    /// A record or key does not match the schema.
    Codec(CodecError),
    /// A node operation failed.
    Node(NodeError),
    /// Block I/O failed.
    Storage(StorageError),
    /// The configuration is invalid.
    Config(ConfigError),
    /// Creating the store directory or writing a dump failed.
    Io(io::Error),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema(e) => write!(f, "schema error: {e}"),
            Self::Codec(e) => write!(f, "invalid tuple: {e}"),
            Self::Node(e) => write!(f, "node error: {e}"),
            Self::Storage(e) => write!(f, "storage error: {e}"),
            Self::Config(e) => write!(f, "config error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for TreeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Schema(e) => Some(e),
            Self::Codec(e) => Some(e),
            Self::Node(e) => Some(e),
            Self::Storage(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io(e) => Some(e),
        }
    }
}

impl From<SchemaError> for TreeError {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e)
    }
}

impl From<CodecError> for TreeError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

impl From<NodeError> for TreeError {
    fn from(e: NodeError) -> Self {
        Self::Node(e)
    }
}

impl From<StorageError> for TreeError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ConfigError> for TreeError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<io::Error> for TreeError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

//! Block layout and constants.
//!
//! Every block is exactly [`BLOCK_SIZE`] bytes:
//! - byte 0: liveness flag (1 = occupied)
//! - byte 1: node kind (1 = leaf, 0 = internal)
//! - bytes 2..: node payload, zero padded to the end of the block

/// Block size in bytes.
pub const BLOCK_SIZE: usize = 1024;

/// Block size as u64 for offset calculations.
pub const BLOCK_SIZE_U64: u64 = BLOCK_SIZE as u64;

/// Bytes of framing per block that are not record or key data: the two header
/// bytes, the entry/key count, and the trailing sibling pointer or child count
/// plus the extra child pointer of an internal node.
pub const HEADER_OVERHEAD: usize = 14;

/// Size of the per-block header (liveness + kind).
pub const BLOCK_HEADER_SIZE: usize = 2;

/// Size of a serialized block pointer.
pub const POINTER_SIZE: usize = 4;

/// A block identifier; the block lives at byte offset `pointer * BLOCK_SIZE`.
pub type BlockPointer = u32;

/// The root always lives here.
pub const ROOT_BLOCK: BlockPointer = 0;

/// Liveness flag value for an occupied block.
pub const LIVE: u8 = 1;

/// Node kind stored in byte 1 of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockKind {
    Internal = 0,
    Leaf = 1,
}

impl TryFrom<u8> for BlockKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Internal),
            1 => Ok(Self::Leaf),
            _ => Err(value),
        }
    }
}

/// A raw block buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Block {
    data: Box<[u8; BLOCK_SIZE]>,
}

impl Block {
    /// Create a zeroed (free) block.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Box::new([0u8; BLOCK_SIZE]),
        }
    }

    /// Frame a node payload as a live block of the given kind.
    ///
    /// Returns `None` if the header plus payload does not fit in one block.
    #[must_use]
    pub fn frame(kind: BlockKind, payload: &[u8]) -> Option<Self> {
        if BLOCK_HEADER_SIZE + payload.len() > BLOCK_SIZE {
            return None;
        }
        let mut block = Self::new();
        block.data[0] = LIVE;
        block.data[1] = kind as u8;
        block.data[BLOCK_HEADER_SIZE..BLOCK_HEADER_SIZE + payload.len()].copy_from_slice(payload);
        Some(block)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8; BLOCK_SIZE] {
        &mut self.data
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.data[0] == LIVE
    }

    /// The raw kind byte; not guaranteed to be a valid [`BlockKind`].
    #[must_use]
    pub fn kind_byte(&self) -> u8 {
        self.data[1]
    }

    /// The bytes after the header.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.data[BLOCK_HEADER_SIZE..]
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("live", &self.data[0])
            .field("kind", &self.data[1])
            .finish_non_exhaustive()
    }
}

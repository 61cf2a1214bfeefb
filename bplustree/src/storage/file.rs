//! File-backed block storage.
//!
//! This module handles reading and writing blocks to the single index file.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::storage::block::{BLOCK_SIZE, BLOCK_SIZE_U64, Block, BlockPointer};
use crate::storage::io::{BlockStorage, StorageError};

/// An index file handle with block I/O operations.
pub struct BlockFile {
    file: File,
    path: PathBuf,
}

impl BlockFile {
    /// Open the file at `path`, creating an empty one if it does not exist.
    pub fn open_or_create(path: &Path) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn len(&self) -> Result<u64, StorageError> {
        Ok(self.file.metadata()?.len())
    }
}

impl BlockStorage for BlockFile {
    fn read_block(&mut self, pointer: BlockPointer) -> Result<Option<Block>, StorageError> {
        let offset = u64::from(pointer) * BLOCK_SIZE_U64;
        if offset + BLOCK_SIZE_U64 > self.len()? {
            return Ok(None);
        }

        let mut block = Block::new();
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(block.as_bytes_mut())?;
        Ok(Some(block))
    }

    fn write_block(&mut self, pointer: BlockPointer, block: &Block) -> Result<(), StorageError> {
        let offset = u64::from(pointer) * BLOCK_SIZE_U64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(block.as_bytes())?;
        Ok(())
    }

    fn block_count(&mut self) -> Result<BlockPointer, StorageError> {
        let blocks = self.len()? / BLOCK_SIZE_U64;
        BlockPointer::try_from(blocks).map_err(|_| StorageError::TooManyBlocks(blocks))
    }

    fn sync(&mut self) -> Result<(), StorageError> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

impl std::fmt::Debug for BlockFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockFile")
            .field("path", &self.path)
            .field("block_size", &BLOCK_SIZE)
            .finish_non_exhaustive()
    }
}

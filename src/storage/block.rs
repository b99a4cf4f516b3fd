//! Block Accessor
//!
//! Reads and writes fixed-size blocks at `index * block_size` in a data file.
//! A `BlockFile` is opened per operation and closed when dropped, on success
//! and error paths alike.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};

/// A data file viewed as a sequence of equally sized blocks
pub struct BlockFile {
    file: File,
    path: PathBuf,
    block_size: usize,
}

impl BlockFile {
    /// Create (or truncate) a data file for writing
    pub fn create(path: &Path, block_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::wrap(file, path, block_size))
    }

    /// Open an existing data file read-only
    pub fn open(path: &Path, block_size: usize) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::wrap(file, path, block_size))
    }

    /// Open an existing data file for in-place updates
    pub fn open_rw(path: &Path, block_size: usize) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self::wrap(file, path, block_size))
    }

    /// Open for updates, creating an empty file if none exists
    pub fn open_or_create(path: &Path, block_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        Ok(Self::wrap(file, path, block_size))
    }

    /// Open read-only, or `None` when the file does not exist
    pub fn open_if_exists(path: &Path, block_size: usize) -> Result<Option<Self>> {
        match File::open(path) {
            Ok(file) => Ok(Some(Self::wrap(file, path, block_size))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn wrap(file: File, path: &Path, block_size: usize) -> Self {
        Self {
            file,
            path: path.to_path_buf(),
            block_size,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of whole blocks in the file; a trailing partial block is ignored
    pub fn block_count(&self) -> Result<usize> {
        let len = self.file.metadata()?.len() as usize;
        Ok(len / self.block_size)
    }

    /// Read block `index`
    pub fn read_block(&mut self, index: usize) -> Result<Vec<u8>> {
        let mut block = vec![0u8; self.block_size];
        self.file.seek(SeekFrom::Start(self.offset_of(index)))?;
        self.file.read_exact(&mut block)?;
        Ok(block)
    }

    /// Write `data` as block `index`, zero-padding it to the block size
    ///
    /// The whole block goes out in a single write.
    pub fn write_block(&mut self, index: usize, data: &[u8]) -> Result<()> {
        if data.len() > self.block_size {
            return Err(StoreError::format(format!(
                "block {} payload is {} bytes, larger than the {}-byte block",
                index,
                data.len(),
                self.block_size
            )));
        }

        let mut padded = vec![0u8; self.block_size];
        padded[..data.len()].copy_from_slice(data);

        self.file.seek(SeekFrom::Start(self.offset_of(index)))?;
        self.file.write_all(&padded)?;
        Ok(())
    }

    /// Overwrite `bytes` at `offset` inside block `index`
    pub fn patch(&mut self, index: usize, offset: usize, bytes: &[u8]) -> Result<()> {
        if offset + bytes.len() > self.block_size {
            return Err(StoreError::format(format!(
                "patch of {} bytes at offset {} overruns block {}",
                bytes.len(),
                offset,
                index
            )));
        }

        self.file
            .seek(SeekFrom::Start(self.offset_of(index) + offset as u64))?;
        self.file.write_all(bytes)?;
        Ok(())
    }

    /// Iterate over `(index, block)` pairs in file order
    pub fn blocks(&mut self) -> Result<Blocks<'_>> {
        let count = self.block_count()?;
        Ok(Blocks {
            file: self,
            next: 0,
            count,
        })
    }

    fn offset_of(&self, index: usize) -> u64 {
        index as u64 * self.block_size as u64
    }
}

/// Sequential reader over every block of a `BlockFile`
pub struct Blocks<'a> {
    file: &'a mut BlockFile,
    next: usize,
    count: usize,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = Result<(usize, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(self.file.read_block(index).map(|block| (index, block)))
    }
}

//! Variable-length contiguous storage
//!
//! Frames are packed back to back inside a block and never cross a block
//! boundary. A block's record chain ends at the first zero size prefix.
//!
//! ## Insertion policies
//! - `write_all`: next-fit. Only the most recent block is ever filled; when a
//!   frame does not fit, that block is closed and a new one starts.
//! - `add_many`: first-fit. Existing blocks are tried in index order, so a
//!   record can land in an older block that still has room.
//!
//! ## Update
//! An update is spliced into its block when the block's real free space covers
//! the size change; later frames shift to stay contiguous. Otherwise the old
//! frame is tombstoned and the new one goes through `add_many`.

use std::path::Path;

use crate::codec::{
    chain_end, encode_frame, Decoded, FrameChain, FrameRef, RecordStatus, MIN_FRAME_LEN,
    STATUS_OFFSET,
};
use crate::config::StrategyKind;
use crate::error::{Result, StoreError};
use crate::record::Student;

use super::{BlockFile, BlockPacker, BlockStats, PackMode, Storage, StoreStats};

/// Where an active frame lives
struct Location {
    block_index: usize,
    offset: usize,
    len: usize,
    /// Contents of the block at the time it was located
    block: Vec<u8>,
}

/// Variable-length records that never span blocks
#[derive(Debug, Clone)]
pub struct ContiguousStorage {
    block_size: usize,
}

impl ContiguousStorage {
    /// Create the strategy, rejecting blocks smaller than the smallest frame
    pub fn new(block_size: usize) -> Result<Self> {
        check_block_size(block_size)?;
        Ok(Self { block_size })
    }

    /// Encode `record`, failing if its frame cannot fit in one block
    fn encode_checked(&self, record: &Student) -> Result<Vec<u8>> {
        let frame = encode_frame(record);
        if frame.len() > self.block_size {
            return Err(StoreError::Capacity {
                key: record.key,
                frame_len: frame.len(),
                limit: self.block_size,
            });
        }
        Ok(frame)
    }

    fn encode_all(&self, records: &[Student]) -> Result<Vec<Vec<u8>>> {
        records.iter().map(|r| self.encode_checked(r)).collect()
    }

    /// Find the active frame holding `key`
    fn locate(&self, file: &mut BlockFile, key: u32) -> Result<Location> {
        for item in file.blocks()? {
            let (block_index, block) = item?;

            let found = active_frames(&block, block_index)
                .find(|frame| frame.key() == Some(key))
                .map(|frame| (frame.offset, frame.len()));

            if let Some((offset, len)) = found {
                return Ok(Location {
                    block_index,
                    offset,
                    len,
                    block,
                });
            }
        }
        Err(StoreError::NotFound(key))
    }

    /// Put `frame` into the first block with real room for it
    ///
    /// `used` holds the last known bytes-used per block. It only filters
    /// candidates; the block's chain is rescanned before committing.
    fn insert_first_fit(
        &self,
        file: &mut BlockFile,
        used: &mut [usize],
        frame: &[u8],
    ) -> Result<Option<usize>> {
        for (index, known) in used.iter_mut().enumerate() {
            if *known + frame.len() > self.block_size {
                continue;
            }

            let mut block = file.read_block(index)?;
            let end = chain_end(&block);
            *known = end;

            if end + frame.len() <= self.block_size {
                block[end..end + frame.len()].copy_from_slice(frame);
                file.write_block(index, &block)?;
                *known = end + frame.len();
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Per-block figures from the block's bytes
    fn scan_block(&self, index: usize, block: &[u8]) -> BlockStats {
        let mut bytes_used = 0;
        let mut record_count = 0;

        for item in FrameChain::new(block) {
            match item {
                Ok(frame) => {
                    bytes_used += frame.len();
                    if frame.is_active() {
                        match frame.decode() {
                            Ok(Decoded::Record(_)) => record_count += 1,
                            Ok(Decoded::Tombstone) => {}
                            Err(e) => tracing::warn!(
                                block = index,
                                offset = frame.offset,
                                "unreadable record: {}",
                                e
                            ),
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(block = index, "stopping block scan: {}", e);
                    break;
                }
            }
        }

        BlockStats::new(index, bytes_used, self.block_size, record_count)
    }
}

impl Storage for ContiguousStorage {
    fn write_all(&self, path: &Path, records: &[Student]) -> Result<()> {
        // Every frame is checked before the file is touched
        let frames = self.encode_all(records)?;

        let mut packer = BlockPacker::new(self.block_size, PackMode::Contiguous);
        for frame in &frames {
            packer.push(frame);
        }
        let blocks = packer.finish();

        let mut file = BlockFile::create(path, self.block_size)?;
        for block in &blocks {
            file.write_block(block.index, &block.bytes)?;
        }

        tracing::info!(
            records = records.len(),
            blocks = blocks.len(),
            block_size = self.block_size,
            "wrote {}",
            path.display()
        );
        Ok(())
    }

    fn find_by_key(&self, path: &Path, key: u32) -> Result<Student> {
        let mut file = BlockFile::open(path, self.block_size)?;

        for item in file.blocks()? {
            let (block_index, block) = item?;
            for frame in active_frames(&block, block_index) {
                if frame.key() != Some(key) {
                    continue;
                }
                if let Decoded::Record(student) = frame.decode()? {
                    return Ok(student);
                }
            }
        }

        Err(StoreError::NotFound(key))
    }

    fn list_all(&self, path: &Path) -> Result<Vec<Student>> {
        let mut file = BlockFile::open(path, self.block_size)?;
        let mut students = Vec::new();

        for item in file.blocks()? {
            let (block_index, block) = item?;
            for frame in active_frames(&block, block_index) {
                if let Decoded::Record(student) = frame.decode()? {
                    if student.key > 0 {
                        students.push(student);
                    }
                }
            }
        }

        Ok(students)
    }

    fn add_many(&self, path: &Path, records: &[Student]) -> Result<()> {
        let frames = self.encode_all(records)?;

        // Fresh scan; counters from earlier calls are never trusted
        let stats = self.stats(path)?;
        let mut used: Vec<usize> = stats.blocks.iter().map(|b| b.bytes_used).collect();

        let mut file = BlockFile::open_or_create(path, self.block_size)?;

        for (record, frame) in records.iter().zip(&frames) {
            if let Some(index) = self.insert_first_fit(&mut file, &mut used, frame)? {
                tracing::debug!(key = record.key, block = index, "inserted into existing block");
                continue;
            }

            let index = used.len();
            file.write_block(index, frame)?;
            used.push(frame.len());
            tracing::debug!(key = record.key, block = index, "appended new block");
        }

        Ok(())
    }

    fn update(&self, path: &Path, record: &Student) -> Result<()> {
        let new_frame = self.encode_checked(record)?;

        let mut file = BlockFile::open_rw(path, self.block_size)?;
        let location = self.locate(&mut file, record.key)?;

        let actual_used = chain_end(&location.block);
        let space_free = (self.block_size - actual_used) as isize;
        let size_delta = new_frame.len() as isize - location.len as isize;

        if space_free >= size_delta {
            let old_end = location.offset + location.len;

            let mut spliced = Vec::with_capacity(self.block_size);
            spliced.extend_from_slice(&location.block[..location.offset]);
            spliced.extend_from_slice(&new_frame);
            if old_end < actual_used {
                spliced.extend_from_slice(&location.block[old_end..actual_used]);
            }

            file.write_block(location.block_index, &spliced)?;
            tracing::debug!(
                key = record.key,
                block = location.block_index,
                size_delta,
                "updated in place"
            );
            return Ok(());
        }

        file.patch(
            location.block_index,
            location.offset + STATUS_OFFSET,
            &[RecordStatus::Deleted as u8],
        )?;
        drop(file);

        tracing::debug!(
            key = record.key,
            block = location.block_index,
            size_delta,
            space_free,
            "record outgrew its block, relocating"
        );
        self.add_many(path, std::slice::from_ref(record))
    }

    fn delete(&self, path: &Path, key: u32) -> Result<()> {
        let mut file = BlockFile::open_rw(path, self.block_size)?;
        let location = self.locate(&mut file, key)?;

        file.patch(
            location.block_index,
            location.offset + STATUS_OFFSET,
            &[RecordStatus::Deleted as u8],
        )?;

        tracing::debug!(key, block = location.block_index, "tombstoned");
        Ok(())
    }

    fn stats(&self, path: &Path) -> Result<StoreStats> {
        let Some(mut file) = BlockFile::open_if_exists(path, self.block_size)? else {
            return Ok(StoreStats::empty());
        };

        let mut blocks = Vec::new();
        for item in file.blocks()? {
            let (index, block) = item?;
            blocks.push(self.scan_block(index, &block));
        }

        Ok(StoreStats::from_blocks(self.block_size, blocks))
    }

    fn validate_block_size(&self, block_size: usize) -> Result<()> {
        check_block_size(block_size)
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Contiguous
    }
}

fn check_block_size(block_size: usize) -> Result<()> {
    if block_size < MIN_FRAME_LEN {
        return Err(StoreError::Config(format!(
            "block size of {} bytes is smaller than the minimum frame of {} bytes",
            block_size, MIN_FRAME_LEN
        )));
    }
    Ok(())
}

/// Active frames of one block; a malformed header ends the walk with a warning
fn active_frames(block: &[u8], block_index: usize) -> impl Iterator<Item = FrameRef<'_>> {
    FrameChain::new(block)
        .map_while(move |item| match item {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::warn!(block = block_index, "stopping block scan: {}", e);
                None
            }
        })
        .filter(|frame| frame.is_active())
}

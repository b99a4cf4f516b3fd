//! Variable-length fragmented storage
//!
//! Same frames as the contiguous strategy, but a frame that does not fit in
//! the rest of the current block is split: the part that fits fills the block
//! and the remaining declared bytes continue at offset 0 of the next block(s).
//!
//! ## Layout Rules
//! ```text
//! block n                              block n+1
//! ┌──────────┬──────────┬───────────┐  ┌────────────┬──────────┬──────┐
//! │ frame A  │ frame B  │ C (head…) │  │ (…rest C)  │ frame D  │ 0000 │
//! └──────────┴──────────┴───────────┘  └────────────┴──────────┴──────┘
//! ```
//! - A frame only starts where its 5-byte head (size + status) fits, so the
//!   status byte always lives in the block the frame starts in.
//! - Fewer than 5 trailing bytes are padding.
//! - Continuations carry no header; they are found by reading blocks in order
//!   and tracking how many declared bytes are still owed.
//!
//! Every read path therefore scans from block 0.

use std::path::Path;

use crate::codec::{
    chain_end_from, encode_frame, is_sentinel, Cursor, Decoded, FrameRef, RecordStatus,
    FRAME_HEAD_LEN, LEN_PREFIX, STATUS_OFFSET,
};
use crate::config::StrategyKind;
use crate::error::{Result, StoreError};
use crate::record::Student;

use super::{BlockFile, BlockPacker, BlockStats, PackMode, Storage, StoreStats};

/// A complete frame reassembled from one or more blocks
struct SpanFrame {
    /// Block holding the frame head
    block_index: usize,
    /// Offset of the head within that block
    offset: usize,
    /// Whole frame, size prefix included
    bytes: Vec<u8>,
}

impl SpanFrame {
    fn view(&self) -> Result<FrameRef<'_>> {
        FrameRef::parse(&self.bytes, 0)
    }

    fn is_active(&self) -> bool {
        self.bytes.get(STATUS_OFFSET) == Some(&(RecordStatus::Active as u8))
    }

    fn key(&self) -> Option<u32> {
        Cursor::new(self.bytes.get(FRAME_HEAD_LEN..)?)
            .read_u32("key")
            .ok()
    }
}

/// Occupancy of one block as seen by a sequential scan
#[derive(Debug, Clone, Copy, Default)]
struct BlockUsage {
    /// Bytes covered by frames or continuations
    used: usize,
    /// Leading bytes that belong to a frame started in an earlier block
    continuation: usize,
    /// The block's last frame continues into the next block
    spills: bool,
}

/// Result of scanning a whole file
struct Layout {
    frames: Vec<SpanFrame>,
    blocks: Vec<BlockUsage>,
}

/// A frame whose bytes are still owed by later blocks
struct Pending {
    block_index: usize,
    offset: usize,
    len: usize,
    bytes: Vec<u8>,
}

/// Variable-length records that may span consecutive blocks
#[derive(Debug, Clone)]
pub struct FragmentedStorage {
    block_size: usize,
}

impl FragmentedStorage {
    /// Create the strategy; a block must at least hold one frame head
    pub fn new(block_size: usize) -> Result<Self> {
        check_block_size(block_size)?;
        Ok(Self { block_size })
    }

    /// Reassemble every frame of the file, block by block
    fn scan(&self, file: &mut BlockFile) -> Result<Layout> {
        let block_size = self.block_size;
        let mut frames = Vec::new();
        let mut blocks = Vec::new();
        let mut pending: Option<Pending> = None;

        for item in file.blocks()? {
            let (index, block) = item?;
            let mut usage = BlockUsage::default();
            let mut cursor = 0;

            if let Some(mut owed) = pending.take() {
                let take = (owed.len - owed.bytes.len()).min(block_size);
                owed.bytes.extend_from_slice(&block[..take]);
                usage.continuation = take;
                cursor = take;

                if owed.bytes.len() < owed.len {
                    usage.used = block_size;
                    usage.spills = true;
                    blocks.push(usage);
                    pending = Some(owed);
                    continue;
                }

                frames.push(SpanFrame {
                    block_index: owed.block_index,
                    offset: owed.offset,
                    bytes: owed.bytes,
                });
            }

            while cursor + FRAME_HEAD_LEN <= block_size && !is_sentinel(&block[cursor..]) {
                let mut head = Cursor::new(&block[cursor..]);
                let len = LEN_PREFIX + head.read_u32("frame size")? as usize;

                if let Err(e) = head.read_u8("status").and_then(RecordStatus::from_byte) {
                    tracing::warn!(block = index, offset = cursor, "stopping block scan: {}", e);
                    break;
                }

                if cursor + len <= block_size {
                    frames.push(SpanFrame {
                        block_index: index,
                        offset: cursor,
                        bytes: block[cursor..cursor + len].to_vec(),
                    });
                    cursor += len;
                } else {
                    pending = Some(Pending {
                        block_index: index,
                        offset: cursor,
                        len,
                        bytes: block[cursor..].to_vec(),
                    });
                    usage.spills = true;
                    cursor = block_size;
                }
            }

            usage.used = cursor;
            blocks.push(usage);
        }

        if let Some(owed) = pending {
            tracing::warn!(
                block = owed.block_index,
                offset = owed.offset,
                missing = owed.len - owed.bytes.len(),
                "file ends inside a record; ignoring it"
            );
        }

        Ok(Layout { frames, blocks })
    }

    /// Scan the file at `path`
    fn scan_path(&self, path: &Path) -> Result<Layout> {
        let mut file = BlockFile::open(path, self.block_size)?;
        self.scan(&mut file)
    }

    /// Overwrite `bytes` starting at (`block_index`, `offset`), continuing
    /// into following blocks as needed
    fn write_span(
        &self,
        file: &mut BlockFile,
        mut block_index: usize,
        mut offset: usize,
        bytes: &[u8],
    ) -> Result<()> {
        let mut rest = bytes;
        while !rest.is_empty() {
            let take = (self.block_size - offset).min(rest.len());
            file.patch(block_index, offset, &rest[..take])?;
            rest = &rest[take..];
            block_index += 1;
            offset = 0;
        }
        Ok(())
    }

    /// First block that can hold `frame` whole in its free tail
    ///
    /// The candidate's chain is rescanned from its continuation before
    /// committing.
    fn insert_first_fit(
        &self,
        file: &mut BlockFile,
        blocks: &mut [BlockUsage],
        frame: &[u8],
    ) -> Result<Option<usize>> {
        for (index, usage) in blocks.iter_mut().enumerate() {
            if usage.spills || usage.used + frame.len() > self.block_size {
                continue;
            }

            let mut block = file.read_block(index)?;
            let end = chain_end_from(&block, usage.continuation);
            usage.used = end;

            if end + frame.len() <= self.block_size {
                block[end..end + frame.len()].copy_from_slice(frame);
                file.write_block(index, &block)?;
                usage.used = end + frame.len();
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Packer that continues from the tail of the last block, or opens a new
    /// block when the tail cannot take a frame head
    fn tail_packer(&self, file: &mut BlockFile, blocks: &mut [BlockUsage]) -> Result<BlockPacker> {
        let count = blocks.len();
        if let Some(last) = blocks.last_mut() {
            if !last.spills && self.block_size - last.used >= FRAME_HEAD_LEN {
                let block = file.read_block(count - 1)?;
                let prefix = block[..last.used].to_vec();
                // The packer owns this block from now on
                last.used = self.block_size;
                return Ok(BlockPacker::resume(
                    self.block_size,
                    PackMode::Spanning,
                    count - 1,
                    prefix,
                ));
            }
        }
        Ok(BlockPacker::resume(
            self.block_size,
            PackMode::Spanning,
            count,
            Vec::new(),
        ))
    }

    fn find_frame<'a>(&self, layout: &'a Layout, key: u32) -> Result<&'a SpanFrame> {
        layout
            .frames
            .iter()
            .find(|frame| frame.is_active() && frame.key() == Some(key))
            .ok_or(StoreError::NotFound(key))
    }
}

impl Storage for FragmentedStorage {
    fn write_all(&self, path: &Path, records: &[Student]) -> Result<()> {
        let mut packer = BlockPacker::new(self.block_size, PackMode::Spanning);
        for record in records {
            packer.push(&encode_frame(record));
        }
        let blocks = packer.finish();

        let mut file = BlockFile::create(path, self.block_size)?;
        for block in &blocks {
            file.write_block(block.index, &block.bytes)?;
        }

        tracing::info!(
            records = records.len(),
            blocks = blocks.len(),
            spanning = blocks.iter().filter(|b| b.spills).count(),
            block_size = self.block_size,
            "wrote {}",
            path.display()
        );
        Ok(())
    }

    fn find_by_key(&self, path: &Path, key: u32) -> Result<Student> {
        let layout = self.scan_path(path)?;
        let frame = self.find_frame(&layout, key)?;

        match frame.view()?.decode()? {
            Decoded::Record(student) => Ok(student),
            Decoded::Tombstone => Err(StoreError::NotFound(key)),
        }
    }

    fn list_all(&self, path: &Path) -> Result<Vec<Student>> {
        let layout = self.scan_path(path)?;
        let mut students = Vec::new();

        for frame in layout.frames.iter().filter(|f| f.is_active()) {
            if let Decoded::Record(student) = frame.view()?.decode()? {
                if student.key > 0 {
                    students.push(student);
                }
            }
        }

        Ok(students)
    }

    fn add_many(&self, path: &Path, records: &[Student]) -> Result<()> {
        let frames: Vec<Vec<u8>> = records.iter().map(encode_frame).collect();

        let mut file = BlockFile::open_or_create(path, self.block_size)?;
        let mut layout = self.scan(&mut file)?;
        let mut tail: Option<BlockPacker> = None;

        for (record, frame) in records.iter().zip(&frames) {
            if let Some(index) = self.insert_first_fit(&mut file, &mut layout.blocks, frame)? {
                tracing::debug!(key = record.key, block = index, "inserted into existing block");
                continue;
            }

            if tail.is_none() {
                tail = Some(self.tail_packer(&mut file, &mut layout.blocks)?);
            }
            if let Some(packer) = tail.as_mut() {
                packer.push(frame);
            }
            tracing::debug!(key = record.key, "queued for the file tail");
        }

        if let Some(packer) = tail {
            for block in packer.finish() {
                file.write_block(block.index, &block.bytes)?;
                tracing::debug!(
                    block = block.index,
                    used = block.bytes.len(),
                    spills = block.spills,
                    "wrote tail block"
                );
            }
        }

        Ok(())
    }

    fn update(&self, path: &Path, record: &Student) -> Result<()> {
        let new_frame = encode_frame(record);

        let mut file = BlockFile::open_rw(path, self.block_size)?;
        let layout = self.scan(&mut file)?;
        let frame = self.find_frame(&layout, record.key)?;
        let old_len = frame.bytes.len();

        // Same footprint: overwrite where it lies, even across blocks
        if new_frame.len() == old_len {
            self.write_span(&mut file, frame.block_index, frame.offset, &new_frame)?;
            tracing::debug!(key = record.key, block = frame.block_index, "rewritten in place");
            return Ok(());
        }

        let usage = layout.blocks[frame.block_index];
        let within_block = frame.offset + old_len <= self.block_size && !usage.spills;

        if within_block {
            let block = file.read_block(frame.block_index)?;
            let actual_used = chain_end_from(&block, usage.continuation);
            let space_free = (self.block_size - actual_used) as isize;
            let size_delta = new_frame.len() as isize - old_len as isize;

            if space_free >= size_delta {
                let old_end = frame.offset + old_len;

                let mut spliced = Vec::with_capacity(self.block_size);
                spliced.extend_from_slice(&block[..frame.offset]);
                spliced.extend_from_slice(&new_frame);
                if old_end < actual_used {
                    spliced.extend_from_slice(&block[old_end..actual_used]);
                }

                file.write_block(frame.block_index, &spliced)?;
                tracing::debug!(
                    key = record.key,
                    block = frame.block_index,
                    size_delta,
                    "updated in place"
                );
                return Ok(());
            }
        }

        file.patch(
            frame.block_index,
            frame.offset + STATUS_OFFSET,
            &[RecordStatus::Deleted as u8],
        )?;
        drop(file);

        tracing::debug!(key = record.key, block = frame.block_index, "relocating record");
        self.add_many(path, std::slice::from_ref(record))
    }

    fn delete(&self, path: &Path, key: u32) -> Result<()> {
        let mut file = BlockFile::open_rw(path, self.block_size)?;
        let layout = self.scan(&mut file)?;
        let frame = self.find_frame(&layout, key)?;

        file.patch(
            frame.block_index,
            frame.offset + STATUS_OFFSET,
            &[RecordStatus::Deleted as u8],
        )?;

        tracing::debug!(key, block = frame.block_index, "tombstoned");
        Ok(())
    }

    fn stats(&self, path: &Path) -> Result<StoreStats> {
        let Some(mut file) = BlockFile::open_if_exists(path, self.block_size)? else {
            return Ok(StoreStats::empty());
        };
        let layout = self.scan(&mut file)?;

        let mut record_counts = vec![0usize; layout.blocks.len()];
        for frame in layout.frames.iter().filter(|f| f.is_active()) {
            match frame.view().and_then(|view| view.decode()) {
                Ok(Decoded::Record(_)) => record_counts[frame.block_index] += 1,
                Ok(Decoded::Tombstone) => {}
                Err(e) => tracing::warn!(
                    block = frame.block_index,
                    offset = frame.offset,
                    "unreadable record: {}",
                    e
                ),
            }
        }

        let blocks = layout
            .blocks
            .iter()
            .zip(record_counts)
            .enumerate()
            .map(|(index, (usage, records))| {
                BlockStats::new(index, usage.used, self.block_size, records)
            })
            .collect();

        Ok(StoreStats::from_blocks(self.block_size, blocks))
    }

    fn validate_block_size(&self, block_size: usize) -> Result<()> {
        check_block_size(block_size)
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Fragmented
    }
}

fn check_block_size(block_size: usize) -> Result<()> {
    if block_size < FRAME_HEAD_LEN {
        return Err(StoreError::Config(format!(
            "block size of {} bytes cannot hold a {}-byte frame head",
            block_size, FRAME_HEAD_LEN
        )));
    }
    Ok(())
}

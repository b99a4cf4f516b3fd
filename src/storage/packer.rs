//! Sequential block packer
//!
//! Appends frames to an in-progress block and closes it when the next frame
//! does not fit. Shared by bulk writes, reorganization and tail appends.
//!
//! The per-block record counts it keeps are advisory: they describe only the
//! frames pushed through this packer and are never reported as statistics.

use crate::codec::FRAME_HEAD_LEN;

/// How a frame that overflows the current block is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackMode {
    /// Start a new block; frames never cross a boundary
    Contiguous,
    /// Fill the current block and continue the frame in the next one(s)
    Spanning,
}

/// A closed block ready to be written
#[derive(Debug, Clone)]
pub struct PackedBlock {
    pub index: usize,
    /// Used bytes, not yet padded to the block size
    pub bytes: Vec<u8>,
    /// Frames whose head lies in this block
    pub record_count: usize,
    /// The last frame continues into the next block
    pub spills: bool,
}

/// Builder that packs frames into consecutive blocks
pub struct BlockPacker {
    block_size: usize,
    mode: PackMode,
    current: Vec<u8>,
    current_index: usize,
    current_records: usize,
    closed: Vec<PackedBlock>,
}

impl BlockPacker {
    /// Start packing at block 0 of an empty file
    pub fn new(block_size: usize, mode: PackMode) -> Self {
        Self::resume(block_size, mode, 0, Vec::new())
    }

    /// Continue packing block `index`, whose first `prefix.len()` bytes are taken
    pub fn resume(block_size: usize, mode: PackMode, index: usize, prefix: Vec<u8>) -> Self {
        let mut current = prefix;
        current.reserve(block_size.saturating_sub(current.len()));
        Self {
            block_size,
            mode,
            current,
            current_index: index,
            current_records: 0,
            closed: Vec::new(),
        }
    }

    /// Append one encoded frame
    ///
    /// In contiguous mode the caller guarantees `frame.len() <= block_size`.
    pub fn push(&mut self, frame: &[u8]) {
        match self.mode {
            PackMode::Contiguous => self.push_whole(frame),
            PackMode::Spanning => self.push_spanning(frame),
        }
    }

    fn push_whole(&mut self, frame: &[u8]) {
        debug_assert!(frame.len() <= self.block_size);
        if self.current.len() + frame.len() > self.block_size && !self.current.is_empty() {
            self.close(false);
        }
        self.current.extend_from_slice(frame);
        self.current_records += 1;
    }

    fn push_spanning(&mut self, frame: &[u8]) {
        // The frame head must start in a block with room for all of it
        if self.block_size - self.current.len() < FRAME_HEAD_LEN {
            self.close(false);
        }
        self.current_records += 1;

        let mut rest = frame;
        loop {
            let room = self.block_size - self.current.len();
            let take = room.min(rest.len());
            self.current.extend_from_slice(&rest[..take]);
            rest = &rest[take..];

            if rest.is_empty() {
                break;
            }
            self.close(true);
        }
    }

    fn close(&mut self, spills: bool) {
        let bytes = std::mem::replace(&mut self.current, Vec::with_capacity(self.block_size));
        tracing::trace!(
            block = self.current_index,
            used = bytes.len(),
            records = self.current_records,
            spills,
            "closing block"
        );
        self.closed.push(PackedBlock {
            index: self.current_index,
            bytes,
            record_count: self.current_records,
            spills,
        });
        self.current_index += 1;
        self.current_records = 0;
    }

    /// Close the in-progress block (if it holds anything) and return every block
    pub fn finish(mut self) -> Vec<PackedBlock> {
        if !self.current.is_empty() {
            self.close(false);
        }
        self.closed
    }
}

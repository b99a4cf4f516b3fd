//! Variable-length record frames
//!
//! ## Frame Format
//! ```text
//! ┌────────────────┬────────────┬──────────────────────────────┐
//! │ TotalSize (4)  │ Status (1) │          Payload             │
//! └────────────────┴────────────┴──────────────────────────────┘
//! TotalSize = 1 + len(Payload)   (the size field itself is excluded)
//! ```
//!
//! ### Payload
//! ```text
//! key u32 | name_len u32 | name | national_id [11] | course_len u32 | course
//!         | mother_len u32 | mother | father_len u32 | father
//!         | admission_year u32 | score_hundredths u64
//! ```
//! All integers are little-endian. A run of four zero bytes where a frame
//! would start is the end-of-block sentinel, which is why a valid frame never
//! has a zero size.

use bytes::{BufMut, BytesMut};

use crate::error::{Result, StoreError};
use crate::record::{Student, NATIONAL_ID_LEN};

use super::Cursor;

/// Size of the length prefix
pub const LEN_PREFIX: usize = 4;

/// Size prefix + status byte; the part of a frame that never spans blocks
pub const FRAME_HEAD_LEN: usize = LEN_PREFIX + 1;

/// Offset of the status byte from the start of a frame
pub const STATUS_OFFSET: usize = LEN_PREFIX;

/// Smallest possible frame: every string empty
pub const MIN_FRAME_LEN: usize = FRAME_HEAD_LEN
    + 4 // key
    + 4 // name length
    + NATIONAL_ID_LEN
    + 4 // course length
    + 4 // mother length
    + 4 // father length
    + 4 // admission year
    + 8; // score

/// Liveness flag stored after the size prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordStatus {
    Active = 0x00,
    Deleted = 0x01,
}

impl RecordStatus {
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0x00 => Ok(RecordStatus::Active),
            0x01 => Ok(RecordStatus::Deleted),
            other => Err(StoreError::format(format!(
                "Unknown record status: 0x{:02x}",
                other
            ))),
        }
    }
}

/// Outcome of decoding one frame
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Record(Student),
    Tombstone,
}

// =============================================================================
// Encoding
// =============================================================================

/// On-disk footprint of `student`'s frame, including the size prefix
pub fn frame_len(student: &Student) -> usize {
    MIN_FRAME_LEN
        + student.name.len()
        + student.course.len()
        + student.mother.len()
        + student.father.len()
}

/// Encode a student as an active frame
///
/// The national ID is written as-is; callers guarantee it is exactly
/// `NATIONAL_ID_LEN` bytes via `Student::validate`.
pub fn encode_frame(student: &Student) -> Vec<u8> {
    let len = frame_len(student);
    let mut buf = BytesMut::with_capacity(len);

    buf.put_u32_le((len - LEN_PREFIX) as u32);
    buf.put_u8(RecordStatus::Active as u8);

    buf.put_u32_le(student.key);
    put_prefixed(&mut buf, &student.name);
    buf.put_slice(student.national_id.as_bytes());
    put_prefixed(&mut buf, &student.course);
    put_prefixed(&mut buf, &student.mother);
    put_prefixed(&mut buf, &student.father);
    buf.put_u32_le(student.admission_year);
    buf.put_u64_le(student.score_hundredths());

    buf.to_vec()
}

fn put_prefixed(buf: &mut BytesMut, value: &str) {
    buf.put_u32_le(value.len() as u32);
    buf.put_slice(value.as_bytes());
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a payload (the bytes after the status byte)
///
/// Fails the moment a declared length would run past the payload, when bytes
/// are left over, or when the decoded record does not validate.
pub fn decode_payload(payload: &[u8]) -> Result<Student> {
    let mut cursor = Cursor::new(payload);

    let student = Student {
        key: cursor.read_u32("key")?,
        name: cursor.read_prefixed_str("name")?,
        national_id: cursor.read_str(NATIONAL_ID_LEN, "national_id")?,
        course: cursor.read_prefixed_str("course")?,
        mother: cursor.read_prefixed_str("mother")?,
        father: cursor.read_prefixed_str("father")?,
        admission_year: cursor.read_u32("admission_year")?,
        score: cursor.read_u64("score")? as f64 / 100.0,
    };

    if cursor.remaining() != 0 {
        return Err(StoreError::format(format!(
            "{} trailing bytes after record {}",
            cursor.remaining(),
            student.key
        )));
    }

    student
        .validate()
        .map_err(|e| StoreError::format(format!("decoded record is invalid: {}", e)))?;

    Ok(student)
}

/// Decode the frame at the start of `buf`, where `buf` is the rest of the block
///
/// Returns the record (or tombstone) and the bytes consumed. Tombstones are
/// skipped without parsing their payload.
pub fn decode_frame(buf: &[u8]) -> Result<(Decoded, usize)> {
    let frame = FrameRef::parse(buf, 0)?;
    Ok((frame.decode()?, frame.len()))
}

// =============================================================================
// Frame views and block chains
// =============================================================================

/// A framed record inside a block buffer
#[derive(Debug, Clone, Copy)]
pub struct FrameRef<'a> {
    /// Offset of the size prefix within the block
    pub offset: usize,
    pub status: RecordStatus,
    bytes: &'a [u8],
}

impl<'a> FrameRef<'a> {
    /// Parse the frame header at `offset` in `block`
    pub fn parse(block: &'a [u8], offset: usize) -> Result<Self> {
        let available = block.len().saturating_sub(offset);
        let mut cursor = Cursor::new(&block[offset.min(block.len())..]);

        let total_size = cursor.read_u32("frame size")? as usize;
        if total_size == 0 {
            return Err(StoreError::format(format!(
                "zero-size frame at offset {}",
                offset
            )));
        }

        let len = LEN_PREFIX + total_size;
        if len > available {
            return Err(StoreError::format(format!(
                "frame at offset {} declares {} bytes but only {} remain",
                offset, len, available
            )));
        }

        let status = RecordStatus::from_byte(cursor.read_u8("status")?)?;

        Ok(Self {
            offset,
            status,
            bytes: &block[offset..offset + len],
        })
    }

    /// Footprint in bytes, including the size prefix
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Offset just past this frame
    pub fn end(&self) -> usize {
        self.offset + self.len()
    }

    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[FRAME_HEAD_LEN..]
    }

    /// Peek at the key without decoding the rest of the payload
    pub fn key(&self) -> Option<u32> {
        Cursor::new(self.payload()).read_u32("key").ok()
    }

    pub fn decode(&self) -> Result<Decoded> {
        match self.status {
            RecordStatus::Deleted => Ok(Decoded::Tombstone),
            RecordStatus::Active => decode_payload(self.payload()).map(Decoded::Record),
        }
    }
}

/// Walks the frames of one block from offset 0
///
/// Stops silently at the zero sentinel or when fewer than four bytes remain;
/// a malformed header yields one `Err` and ends the walk.
pub struct FrameChain<'a> {
    block: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> FrameChain<'a> {
    pub fn new(block: &'a [u8]) -> Self {
        Self::starting_at(block, 0)
    }

    /// Walk from `offset`, e.g. after a continuation prefix
    pub fn starting_at(block: &'a [u8], offset: usize) -> Self {
        Self {
            block,
            offset,
            done: false,
        }
    }

    /// Offset where the next frame would start
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for FrameChain<'a> {
    type Item = Result<FrameRef<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset + LEN_PREFIX > self.block.len() {
            return None;
        }

        if is_sentinel(&self.block[self.offset..]) {
            self.done = true;
            return None;
        }

        match FrameRef::parse(self.block, self.offset) {
            Ok(frame) => {
                self.offset = frame.end();
                Some(Ok(frame))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// True when the next four bytes are all zero
pub fn is_sentinel(buf: &[u8]) -> bool {
    buf.len() >= LEN_PREFIX && buf[..LEN_PREFIX].iter().all(|&b| b == 0)
}

/// Real used bytes of a block: the end of its well-formed frame chain
pub fn chain_end(block: &[u8]) -> usize {
    chain_end_from(block, 0)
}

/// End of the frame chain that starts at `start`
pub fn chain_end_from(block: &[u8], start: usize) -> usize {
    let mut chain = FrameChain::starting_at(block, start);
    while let Some(Ok(_)) = chain.next() {}
    chain.offset()
}

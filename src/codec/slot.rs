//! Fixed-size record slots
//!
//! ## Slot Format
//! ```text
//! ┌────────────┬─────────┬──────────────────────────────────────────────┐
//! │ Status (1) │ Key (4) │ Fields, each padded to its configured maximum │
//! └────────────┴─────────┴──────────────────────────────────────────────┘
//! name_len u32 | name [limits.name] | national_id [11]
//! | course_len u32 | course [limits.course]
//! | mother_len u32 | mother [limits.filiation]
//! | father_len u32 | father [limits.filiation]
//! | admission_year u32 | score_hundredths u64
//! ```
//! A slot whose key is zero has never been written.

use bytes::{BufMut, BytesMut};

use crate::error::{Result, StoreError};
use crate::record::{FieldLimits, Student, NATIONAL_ID_LEN};

use super::{Cursor, RecordStatus};

/// Offset of the status byte within a slot
pub const SLOT_STATUS_OFFSET: usize = 0;

/// What a slot currently holds
#[derive(Debug, Clone, PartialEq)]
pub enum SlotContent {
    Empty,
    Tombstone,
    Record(Student),
}

/// Slot geometry derived from the field limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    limits: FieldLimits,
    slot_size: usize,
}

impl SlotLayout {
    pub fn new(limits: FieldLimits) -> Self {
        let slot_size = 1 // status
            + 4 // key
            + 4 + limits.name
            + NATIONAL_ID_LEN
            + 4 + limits.course
            + 2 * (4 + limits.filiation)
            + 4 // admission year
            + 8; // score

        Self { limits, slot_size }
    }

    /// Bytes occupied by every slot
    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    pub fn limits(&self) -> &FieldLimits {
        &self.limits
    }

    /// Encode an active slot
    ///
    /// A field longer than its configured maximum is a `Capacity` error:
    /// records must be truncated before they reach this layout.
    pub fn encode(&self, student: &Student) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(self.slot_size);

        buf.put_u8(RecordStatus::Active as u8);
        buf.put_u32_le(student.key);
        put_padded(&mut buf, student.key, &student.name, self.limits.name)?;
        put_fixed(&mut buf, student.key, &student.national_id)?;
        put_padded(&mut buf, student.key, &student.course, self.limits.course)?;
        put_padded(&mut buf, student.key, &student.mother, self.limits.filiation)?;
        put_padded(&mut buf, student.key, &student.father, self.limits.filiation)?;
        buf.put_u32_le(student.admission_year);
        buf.put_u64_le(student.score_hundredths());

        debug_assert_eq!(buf.len(), self.slot_size);
        Ok(buf.to_vec())
    }

    /// Decode one slot of exactly `slot_size` bytes
    pub fn decode(&self, slot: &[u8]) -> Result<SlotContent> {
        if slot.len() != self.slot_size {
            return Err(StoreError::format(format!(
                "slot must be {} bytes, got {}",
                self.slot_size,
                slot.len()
            )));
        }

        let mut cursor = Cursor::new(slot);
        let status = cursor.read_u8("status")?;
        let key = cursor.read_u32("key")?;

        if key == 0 {
            return Ok(SlotContent::Empty);
        }
        if RecordStatus::from_byte(status)? == RecordStatus::Deleted {
            return Ok(SlotContent::Tombstone);
        }

        let student = Student {
            key,
            name: read_padded(&mut cursor, "name", self.limits.name)?,
            national_id: cursor.read_str(NATIONAL_ID_LEN, "national_id")?,
            course: read_padded(&mut cursor, "course", self.limits.course)?,
            mother: read_padded(&mut cursor, "mother", self.limits.filiation)?,
            father: read_padded(&mut cursor, "father", self.limits.filiation)?,
            admission_year: cursor.read_u32("admission_year")?,
            score: cursor.read_u64("score")? as f64 / 100.0,
        };

        student
            .validate()
            .map_err(|e| StoreError::format(format!("decoded slot is invalid: {}", e)))?;

        Ok(SlotContent::Record(student))
    }

    /// Peek at a slot's key and status without decoding the fields
    pub fn peek(&self, slot: &[u8]) -> Result<(u32, RecordStatus)> {
        let mut cursor = Cursor::new(slot);
        let status = cursor.read_u8("status")?;
        let key = cursor.read_u32("key")?;
        Ok((key, RecordStatus::from_byte(status)?))
    }
}

fn put_padded(buf: &mut BytesMut, key: u32, value: &str, cap: usize) -> Result<()> {
    if value.len() > cap {
        return Err(StoreError::Capacity {
            key,
            frame_len: value.len(),
            limit: cap,
        });
    }
    buf.put_u32_le(value.len() as u32);
    buf.put_slice(value.as_bytes());
    buf.put_bytes(0, cap - value.len());
    Ok(())
}

fn put_fixed(buf: &mut BytesMut, key: u32, value: &str) -> Result<()> {
    if value.len() != NATIONAL_ID_LEN {
        return Err(StoreError::Capacity {
            key,
            frame_len: value.len(),
            limit: NATIONAL_ID_LEN,
        });
    }
    buf.put_slice(value.as_bytes());
    Ok(())
}

fn read_padded(cursor: &mut Cursor<'_>, field: &str, cap: usize) -> Result<String> {
    let len = cursor.read_u32(field)? as usize;
    if len > cap {
        return Err(StoreError::format(format!(
            "{}: length {} exceeds slot capacity {}",
            field, len, cap
        )));
    }
    let value = cursor.read_str(len, field)?;
    cursor.skip(cap - len, field)?;
    Ok(value)
}

//! Bounds-checked read cursor
//!
//! Wraps a byte slice and fails with `StoreError::Format` instead of reading
//! past its end.

use bytes::Buf;

use crate::error::{Result, StoreError};

/// Forward-only reader over a byte slice
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    consumed: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, consumed: 0 }
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Bytes read so far
    pub fn position(&self) -> usize {
        self.consumed
    }

    pub fn read_u8(&mut self, field: &str) -> Result<u8> {
        self.ensure(1, field)?;
        self.consumed += 1;
        Ok(self.buf.get_u8())
    }

    pub fn read_u32(&mut self, field: &str) -> Result<u32> {
        self.ensure(4, field)?;
        self.consumed += 4;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_u64(&mut self, field: &str) -> Result<u64> {
        self.ensure(8, field)?;
        self.consumed += 8;
        Ok(self.buf.get_u64_le())
    }

    /// Read exactly `len` raw bytes
    pub fn read_bytes(&mut self, len: usize, field: &str) -> Result<&'a [u8]> {
        self.ensure(len, field)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        self.consumed += len;
        Ok(head)
    }

    /// Read exactly `len` bytes as UTF-8
    pub fn read_str(&mut self, len: usize, field: &str) -> Result<String> {
        let raw = self.read_bytes(len, field)?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| StoreError::format(format!("{}: invalid UTF-8", field)))
    }

    /// Read a `u32` length followed by that many UTF-8 bytes
    pub fn read_prefixed_str(&mut self, field: &str) -> Result<String> {
        let len = self.read_u32(field)? as usize;
        self.read_str(len, field)
    }

    /// Skip `len` bytes
    pub fn skip(&mut self, len: usize, field: &str) -> Result<()> {
        self.read_bytes(len, field).map(|_| ())
    }

    fn ensure(&self, len: usize, field: &str) -> Result<()> {
        if self.buf.remaining() < len {
            return Err(StoreError::format(format!(
                "{}: need {} bytes at position {}, only {} left",
                field,
                len,
                self.consumed,
                self.buf.remaining()
            )));
        }
        Ok(())
    }
}

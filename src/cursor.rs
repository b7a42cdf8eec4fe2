//! Bounded zero-copy cursor over a shared byte buffer
//!
//! A [`ByteCursor`] is an immutable `[0, len)` view over a reference-counted
//! backing buffer plus a mutable decode position. Sub-regions are zero-copy
//! slices of the same buffer; the bytes themselves are never mutated.

use alloc::string::String;
use bytes::{Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::utf8;
use crate::varint;

/// Bounded view over a shared byte buffer with a decode cursor
#[derive(Debug, Clone)]
pub struct ByteCursor {
    data: Bytes,
    pos: usize,
}

impl ByteCursor {
    /// Create a cursor over the given bytes
    #[inline]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }

    /// Region length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the region is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current decode position
    #[inline]
    pub fn cursor(&self) -> usize {
        self.pos
    }

    /// Move the decode position
    #[inline]
    pub fn set_cursor(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// True when the decode position has not reached the end of the region
    #[inline]
    pub fn has_remaining(&self) -> bool {
        self.pos < self.data.len()
    }

    /// Advance the decode position by `n` bytes
    #[inline]
    pub fn skip(&mut self, n: usize) -> Result<()> {
        let end = self.pos.checked_add(n).ok_or(Error::UnexpectedEof)?;
        if end > self.data.len() {
            return Err(Error::UnexpectedEof);
        }
        self.pos = end;
        Ok(())
    }

    /// Advance the decode position past one varint
    #[inline]
    pub fn skip_varint(&mut self) -> Result<()> {
        self.varint64().map(|_| ())
    }

    /// Read a 64-bit varint at the decode position and advance past it
    #[inline]
    pub fn varint64(&mut self) -> Result<u64> {
        if self.pos > self.data.len() {
            return Err(Error::UnexpectedEof);
        }
        let (value, consumed) = varint::decode_u64(&self.data[self.pos..])?;
        self.pos += consumed;
        Ok(value)
    }

    /// Read a varint at the decode position, truncated to its low 32 bits
    ///
    /// The full (up to 10-byte) varint is still consumed and validated.
    #[inline]
    pub fn varint32(&mut self) -> Result<u32> {
        self.varint64().map(|v| v as u32)
    }

    /// Read a 64-bit varint starting at `start` without moving the cursor
    ///
    /// Returns the value and the position just past the varint.
    #[inline]
    pub fn varint64_at(&self, start: usize) -> Result<(u64, usize)> {
        if start > self.data.len() {
            return Err(Error::UnexpectedEof);
        }
        let (value, consumed) = varint::decode_u64(&self.data[start..])?;
        Ok((value, start + consumed))
    }

    /// Read a little-endian u32 at `start`
    #[inline]
    pub fn u32_at(&self, start: usize) -> Result<u32> {
        let bytes = self.checked_slice(start, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a little-endian i32 at `start`
    #[inline]
    pub fn i32_at(&self, start: usize) -> Result<i32> {
        self.u32_at(start).map(|v| v as i32)
    }

    /// Read a little-endian u64 at `start`
    #[inline]
    pub fn u64_at(&self, start: usize) -> Result<u64> {
        let b = self.checked_slice(start, 8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Read a little-endian f32 at `start`
    #[inline]
    pub fn f32_at(&self, start: usize) -> Result<f32> {
        self.u32_at(start).map(f32::from_bits)
    }

    /// Read a little-endian f64 at `start`
    #[inline]
    pub fn f64_at(&self, start: usize) -> Result<f64> {
        self.u64_at(start).map(f64::from_bits)
    }

    /// Zero-copy slice of `len` bytes starting at `start`
    #[inline]
    pub fn slice(&self, start: usize, len: usize) -> Result<Bytes> {
        let end = start.checked_add(len).ok_or(Error::UnexpectedEof)?;
        if end > self.data.len() {
            return Err(Error::UnexpectedEof);
        }
        Ok(self.data.slice(start..end))
    }

    /// Zero-copy bounded sub-cursor over `[start, start + len)`
    #[inline]
    pub fn sub_cursor(&self, start: usize, len: usize) -> Result<ByteCursor> {
        Ok(ByteCursor::new(self.slice(start, len)?))
    }

    /// Concatenate the regions of several cursors into one contiguous buffer
    ///
    /// Used when repeated raw occurrences of a message or group field must
    /// be combined into a single region before decoding.
    pub fn merge(cursors: &[ByteCursor]) -> ByteCursor {
        let total: usize = cursors.iter().map(|c| c.len()).sum();
        let mut merged = BytesMut::with_capacity(total);
        for cursor in cursors {
            merged.extend_from_slice(&cursor.data);
        }
        ByteCursor::new(merged.freeze())
    }

    /// The whole region as shared bytes
    #[inline]
    pub fn as_bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// The whole region as a borrowed slice
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Decode the whole region as UTF-8 text
    #[inline]
    pub fn as_string(&self) -> Result<String> {
        utf8::decode(&self.data)
    }

    #[inline]
    fn checked_slice(&self, start: usize, len: usize) -> Result<&[u8]> {
        let end = start.checked_add(len).ok_or(Error::UnexpectedEof)?;
        if end > self.data.len() {
            return Err(Error::UnexpectedEof);
        }
        Ok(&self.data[start..end])
    }
}

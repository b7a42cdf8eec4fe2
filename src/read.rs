//! Stateless wire readers: byte range in, typed value out
//!
//! Every reader takes a cursor and the payload start offset recorded in the
//! index, and leaves the cursor's own position untouched. Packed-repeated
//! payloads are decoded by running the matching scalar reader until the
//! declared length is consumed exactly.

use alloc::string::String;
use alloc::vec::Vec;
use bytes::Bytes;

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::tag::{self, WireType};
use crate::varint;

/// Read a varint bool
#[inline]
pub fn bool_at(cursor: &ByteCursor, start: usize) -> Result<bool> {
    cursor.varint64_at(start).map(|(v, _)| v != 0)
}

/// Read an int32: the low 32 bits of a possibly 64-bit-encoded varint
#[inline]
pub fn int32_at(cursor: &ByteCursor, start: usize) -> Result<i32> {
    cursor.varint64_at(start).map(|(v, _)| v as u32 as i32)
}

/// Read an int64
#[inline]
pub fn int64_at(cursor: &ByteCursor, start: usize) -> Result<i64> {
    cursor.varint64_at(start).map(|(v, _)| v as i64)
}

/// Read a uint32, truncating to the low 32 bits
#[inline]
pub fn uint32_at(cursor: &ByteCursor, start: usize) -> Result<u32> {
    cursor.varint64_at(start).map(|(v, _)| v as u32)
}

/// Read a uint64
#[inline]
pub fn uint64_at(cursor: &ByteCursor, start: usize) -> Result<u64> {
    cursor.varint64_at(start).map(|(v, _)| v)
}

/// Read a zig-zag encoded sint32
#[inline]
pub fn sint32_at(cursor: &ByteCursor, start: usize) -> Result<i32> {
    cursor
        .varint64_at(start)
        .map(|(v, _)| varint::zigzag_decode32(v as u32))
}

/// Read a zig-zag encoded sint64
#[inline]
pub fn sint64_at(cursor: &ByteCursor, start: usize) -> Result<i64> {
    cursor
        .varint64_at(start)
        .map(|(v, _)| varint::zigzag_decode64(v))
}

/// Read a little-endian fixed32
#[inline]
pub fn fixed32_at(cursor: &ByteCursor, start: usize) -> Result<u32> {
    cursor.u32_at(start)
}

/// Read a little-endian sfixed32
#[inline]
pub fn sfixed32_at(cursor: &ByteCursor, start: usize) -> Result<i32> {
    cursor.i32_at(start)
}

/// Read a little-endian fixed64
#[inline]
pub fn fixed64_at(cursor: &ByteCursor, start: usize) -> Result<u64> {
    cursor.u64_at(start)
}

/// Read a little-endian sfixed64
#[inline]
pub fn sfixed64_at(cursor: &ByteCursor, start: usize) -> Result<i64> {
    cursor.u64_at(start).map(|v| v as i64)
}

/// Read a little-endian float
#[inline]
pub fn float_at(cursor: &ByteCursor, start: usize) -> Result<f32> {
    cursor.f32_at(start)
}

/// Read a little-endian double
#[inline]
pub fn double_at(cursor: &ByteCursor, start: usize) -> Result<f64> {
    cursor.f64_at(start)
}

/// Read a length-prefixed payload as a bounded sub-cursor
#[inline]
pub fn delimited_at(cursor: &ByteCursor, start: usize) -> Result<ByteCursor> {
    let (len, payload_start) = cursor.varint64_at(start)?;
    cursor.sub_cursor(payload_start, len as u32 as usize)
}

/// Read a length-prefixed payload as shared bytes
#[inline]
pub fn bytes_at(cursor: &ByteCursor, start: usize) -> Result<Bytes> {
    delimited_at(cursor, start).map(|c| c.as_bytes())
}

/// Read a length-prefixed UTF-8 string
#[inline]
pub fn string_at(cursor: &ByteCursor, start: usize) -> Result<String> {
    delimited_at(cursor, start)?.as_string()
}

/// Byte span of a group payload starting at `content_start`
///
/// Returns `(content_end, after_end_marker)`: the offset of the matching
/// END_GROUP tag and the offset just past it.
pub fn group_span(cursor: &ByteCursor, content_start: usize, field_number: u32) -> Result<(usize, usize)> {
    let mut scan = cursor.clone();
    scan.set_cursor(content_start);
    loop {
        if !scan.has_remaining() {
            return Err(Error::MissingEndGroup);
        }
        let tag_start = scan.cursor();
        let (number, wire_type) = tag::read_tag(&mut scan)?;
        if wire_type == WireType::EndGroup {
            if number == field_number {
                return Ok((tag_start, scan.cursor()));
            }
            return Err(Error::UnmatchedEndGroup {
                expected: field_number,
                found: number,
            });
        }
        tag::skip_field(&mut scan, wire_type, number)?;
    }
}

/// Read a group payload (between its start and end markers) as a sub-cursor
#[inline]
pub fn group_at(cursor: &ByteCursor, content_start: usize, field_number: u32) -> Result<ByteCursor> {
    let (content_end, _) = group_span(cursor, content_start, field_number)?;
    cursor.sub_cursor(content_start, content_end - content_start)
}

/// Decode a packed varint run with the given element converter
fn packed_varint_at<T>(
    cursor: &ByteCursor,
    start: usize,
    convert: fn(u64) -> T,
) -> Result<Vec<T>> {
    let region = delimited_at(cursor, start)?;
    let mut result = Vec::new();
    let mut pos = 0;
    while pos < region.len() {
        let (raw, next) = region.varint64_at(pos)?;
        result.push(convert(raw));
        pos = next;
    }
    Ok(result)
}

/// Decode a packed fixed-width run with the given element reader
fn packed_fixed_at<T>(
    cursor: &ByteCursor,
    start: usize,
    width: usize,
    read: fn(&ByteCursor, usize) -> Result<T>,
) -> Result<Vec<T>> {
    let region = delimited_at(cursor, start)?;
    if region.len() % width != 0 {
        return Err(Error::PackedLengthMismatch);
    }
    let mut result = Vec::with_capacity(region.len() / width);
    let mut pos = 0;
    while pos < region.len() {
        result.push(read(&region, pos)?);
        pos += width;
    }
    Ok(result)
}

/// Read a packed bool run
pub fn packed_bool_at(cursor: &ByteCursor, start: usize) -> Result<Vec<bool>> {
    packed_varint_at(cursor, start, |v| v != 0)
}

/// Read a packed int32 run
pub fn packed_int32_at(cursor: &ByteCursor, start: usize) -> Result<Vec<i32>> {
    packed_varint_at(cursor, start, |v| v as u32 as i32)
}

/// Read a packed int64 run
pub fn packed_int64_at(cursor: &ByteCursor, start: usize) -> Result<Vec<i64>> {
    packed_varint_at(cursor, start, |v| v as i64)
}

/// Read a packed uint32 run
pub fn packed_uint32_at(cursor: &ByteCursor, start: usize) -> Result<Vec<u32>> {
    packed_varint_at(cursor, start, |v| v as u32)
}

/// Read a packed uint64 run
pub fn packed_uint64_at(cursor: &ByteCursor, start: usize) -> Result<Vec<u64>> {
    packed_varint_at(cursor, start, |v| v)
}

/// Read a packed sint32 run
pub fn packed_sint32_at(cursor: &ByteCursor, start: usize) -> Result<Vec<i32>> {
    packed_varint_at(cursor, start, |v| varint::zigzag_decode32(v as u32))
}

/// Read a packed sint64 run
pub fn packed_sint64_at(cursor: &ByteCursor, start: usize) -> Result<Vec<i64>> {
    packed_varint_at(cursor, start, varint::zigzag_decode64)
}

/// Read a packed fixed32 run
pub fn packed_fixed32_at(cursor: &ByteCursor, start: usize) -> Result<Vec<u32>> {
    packed_fixed_at(cursor, start, 4, fixed32_at)
}

/// Read a packed sfixed32 run
pub fn packed_sfixed32_at(cursor: &ByteCursor, start: usize) -> Result<Vec<i32>> {
    packed_fixed_at(cursor, start, 4, sfixed32_at)
}

/// Read a packed fixed64 run
pub fn packed_fixed64_at(cursor: &ByteCursor, start: usize) -> Result<Vec<u64>> {
    packed_fixed_at(cursor, start, 8, fixed64_at)
}

/// Read a packed sfixed64 run
pub fn packed_sfixed64_at(cursor: &ByteCursor, start: usize) -> Result<Vec<i64>> {
    packed_fixed_at(cursor, start, 8, sfixed64_at)
}

/// Read a packed float run
pub fn packed_float_at(cursor: &ByteCursor, start: usize) -> Result<Vec<f32>> {
    packed_fixed_at(cursor, start, 4, float_at)
}

/// Read a packed double run
pub fn packed_double_at(cursor: &ByteCursor, start: usize) -> Result<Vec<f64>> {
    packed_fixed_at(cursor, start, 8, double_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_varint_readers() {
        // 300, then -1 as a 5-byte 32-bit varint, then zig-zag 3 (= -2)
        let cursor = ByteCursor::new(vec![0xAC, 0x02, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F, 0x03]);

        assert_eq!(uint32_at(&cursor, 0).unwrap(), 300);
        assert_eq!(int32_at(&cursor, 2).unwrap(), -1);
        assert_eq!(sint32_at(&cursor, 7).unwrap(), -2);
        assert!(bool_at(&cursor, 0).unwrap());
    }

    #[test]
    fn test_int32_truncates_wide_varint() {
        let mut data = vec![];
        varint::encode_u64((1u64 << 35) | 7, &mut data);
        let cursor = ByteCursor::new(data);
        assert_eq!(int32_at(&cursor, 0).unwrap(), 7);
    }

    #[test]
    fn test_fixed_readers() {
        let mut data = vec![];
        data.extend_from_slice(&0xDEADBEEFu32.to_le_bytes());
        data.extend_from_slice(&(-9i64).to_le_bytes());
        let cursor = ByteCursor::new(data);

        assert_eq!(fixed32_at(&cursor, 0).unwrap(), 0xDEADBEEF);
        assert_eq!(sfixed32_at(&cursor, 0).unwrap(), 0xDEADBEEFu32 as i32);
        assert_eq!(sfixed64_at(&cursor, 4).unwrap(), -9);
    }

    #[test]
    fn test_sfixed64_from_halves() {
        // -1 is two all-ones little-endian 32-bit halves.
        let cursor = ByteCursor::new(vec![0xFF; 8]);
        assert_eq!(sfixed64_at(&cursor, 0).unwrap(), -1);
        assert_eq!(fixed64_at(&cursor, 0).unwrap(), u64::MAX);
    }

    #[test]
    fn test_delimited_and_string() {
        let cursor = ByteCursor::new(vec![0x03, b'a', b'b', b'c', 0x00]);

        assert_eq!(bytes_at(&cursor, 0).unwrap().as_ref(), b"abc");
        assert_eq!(string_at(&cursor, 0).unwrap(), "abc");
        assert!(bytes_at(&cursor, 4).unwrap().is_empty());
    }

    #[test]
    fn test_delimited_truncated() {
        let cursor = ByteCursor::new(vec![0x05, b'a']);
        assert_eq!(bytes_at(&cursor, 0), Err(Error::UnexpectedEof));
    }

    #[test]
    fn test_packed_varint() {
        // length 3: [1, 150]
        let cursor = ByteCursor::new(vec![0x03, 0x01, 0x96, 0x01]);
        assert_eq!(packed_int32_at(&cursor, 0).unwrap(), [1, 150]);
        assert_eq!(packed_bool_at(&cursor, 0).unwrap(), [true, true]);
    }

    #[test]
    fn test_packed_fixed_length_mismatch() {
        // length 3 is not a whole number of fixed32 elements
        let cursor = ByteCursor::new(vec![0x03, 0x01, 0x02, 0x03]);
        assert_eq!(
            packed_fixed32_at(&cursor, 0),
            Err(Error::PackedLengthMismatch)
        );
    }

    #[test]
    fn test_packed_varint_overrun() {
        // declared length 2 splits a varint in half
        let cursor = ByteCursor::new(vec![0x02, 0x01, 0x80, 0x01]);
        assert_eq!(packed_int32_at(&cursor, 0), Err(Error::UnexpectedEof));
    }

    #[test]
    fn test_group_span() {
        // field 1 varint, end group for field 2, trailer
        let cursor = ByteCursor::new(vec![0x08, 0x05, 0x14, 0x07]);
        let (content_end, after) = group_span(&cursor, 0, 2).unwrap();
        assert_eq!(content_end, 2);
        assert_eq!(after, 3);

        let content = group_at(&cursor, 0, 2).unwrap();
        assert_eq!(content.as_slice(), &[0x08, 0x05]);
    }
}

//! Wire writer: tag/varint/fixed/delimited emission plus verbatim raw copy
//!
//! The writer backs `Kernel::serialize`. Fields that were written get
//! re-encoded through their type's writer; untouched fields are byte-copied
//! straight out of the original buffer, length prefixes included.

use alloc::vec::Vec;
use bytes::Bytes;

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::field::IndexEntry;
use crate::read;
use crate::tag::{make_tag, WireType};
use crate::utf8;
use crate::varint;

/// Growable output buffer with wire-format emission helpers
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Create an empty writer
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when nothing has been written
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Take the accumulated output
    #[inline]
    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.buf)
    }

    /// Emit a field tag
    #[inline]
    pub fn write_tag(&mut self, field_number: u32, wire_type: WireType) {
        varint::encode_u32(make_tag(field_number, wire_type), &mut self.buf);
    }

    /// Emit raw bytes with no framing
    #[inline]
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Emit a bool field
    pub fn write_bool(&mut self, field_number: u32, value: bool) {
        self.write_tag(field_number, WireType::Varint);
        self.buf.push(value as u8);
    }

    /// Emit an int32 field (negatives use 32-bit sign extension, 5 bytes)
    pub fn write_int32(&mut self, field_number: u32, value: i32) {
        self.write_tag(field_number, WireType::Varint);
        varint::encode_i32(value, &mut self.buf);
    }

    /// Emit an int64 field
    pub fn write_int64(&mut self, field_number: u32, value: i64) {
        self.write_tag(field_number, WireType::Varint);
        varint::encode_u64(value as u64, &mut self.buf);
    }

    /// Emit a uint32 field
    pub fn write_uint32(&mut self, field_number: u32, value: u32) {
        self.write_tag(field_number, WireType::Varint);
        varint::encode_u32(value, &mut self.buf);
    }

    /// Emit a uint64 field
    pub fn write_uint64(&mut self, field_number: u32, value: u64) {
        self.write_tag(field_number, WireType::Varint);
        varint::encode_u64(value, &mut self.buf);
    }

    /// Emit a zig-zag encoded sint32 field
    pub fn write_sint32(&mut self, field_number: u32, value: i32) {
        self.write_tag(field_number, WireType::Varint);
        varint::encode_u32(varint::zigzag_encode32(value), &mut self.buf);
    }

    /// Emit a zig-zag encoded sint64 field
    pub fn write_sint64(&mut self, field_number: u32, value: i64) {
        self.write_tag(field_number, WireType::Varint);
        varint::encode_u64(varint::zigzag_encode64(value), &mut self.buf);
    }

    /// Emit a fixed32 field
    pub fn write_fixed32(&mut self, field_number: u32, value: u32) {
        self.write_tag(field_number, WireType::Fixed32);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit an sfixed32 field
    pub fn write_sfixed32(&mut self, field_number: u32, value: i32) {
        self.write_fixed32(field_number, value as u32);
    }

    /// Emit a fixed64 field
    pub fn write_fixed64(&mut self, field_number: u32, value: u64) {
        self.write_tag(field_number, WireType::Fixed64);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit an sfixed64 field
    pub fn write_sfixed64(&mut self, field_number: u32, value: i64) {
        self.write_fixed64(field_number, value as u64);
    }

    /// Emit a float field
    pub fn write_float(&mut self, field_number: u32, value: f32) {
        self.write_tag(field_number, WireType::Fixed32);
        self.buf.extend_from_slice(&value.to_bits().to_le_bytes());
    }

    /// Emit a double field
    pub fn write_double(&mut self, field_number: u32, value: f64) {
        self.write_tag(field_number, WireType::Fixed64);
        self.buf.extend_from_slice(&value.to_bits().to_le_bytes());
    }

    /// Emit a length-delimited field
    pub fn write_delimited(&mut self, field_number: u32, payload: &[u8]) {
        self.write_tag(field_number, WireType::Delimited);
        varint::encode_u64(payload.len() as u64, &mut self.buf);
        self.buf.extend_from_slice(payload);
    }

    /// Emit a string field, encoding the text through the UTF-8 codec
    pub fn write_string(&mut self, field_number: u32, value: &str) {
        self.write_delimited(field_number, &utf8::encode(value));
    }

    /// Emit a group field: start marker, serialized content, end marker
    pub fn write_group(&mut self, field_number: u32, content: &[u8]) {
        self.write_tag(field_number, WireType::StartGroup);
        self.buf.extend_from_slice(content);
        self.write_tag(field_number, WireType::EndGroup);
    }

    /// Emit a packed varint run, pre-sizing the length prefix
    fn write_packed_varints<T: Copy>(
        &mut self,
        field_number: u32,
        values: &[T],
        to_raw: fn(T) -> u64,
    ) {
        if values.is_empty() {
            return;
        }
        let payload_len: usize = values.iter().map(|&v| varint::length_u64(to_raw(v))).sum();
        self.write_tag(field_number, WireType::Delimited);
        varint::encode_u64(payload_len as u64, &mut self.buf);
        for &value in values {
            varint::encode_u64(to_raw(value), &mut self.buf);
        }
    }

    /// Emit a packed bool run
    pub fn write_packed_bool(&mut self, field_number: u32, values: &[bool]) {
        self.write_packed_varints(field_number, values, |v| v as u64);
    }

    /// Emit a packed int32 run
    pub fn write_packed_int32(&mut self, field_number: u32, values: &[i32]) {
        self.write_packed_varints(field_number, values, |v| v as u32 as u64);
    }

    /// Emit a packed int64 run
    pub fn write_packed_int64(&mut self, field_number: u32, values: &[i64]) {
        self.write_packed_varints(field_number, values, |v| v as u64);
    }

    /// Emit a packed uint32 run
    pub fn write_packed_uint32(&mut self, field_number: u32, values: &[u32]) {
        self.write_packed_varints(field_number, values, |v| v as u64);
    }

    /// Emit a packed uint64 run
    pub fn write_packed_uint64(&mut self, field_number: u32, values: &[u64]) {
        self.write_packed_varints(field_number, values, |v| v);
    }

    /// Emit a packed sint32 run
    pub fn write_packed_sint32(&mut self, field_number: u32, values: &[i32]) {
        self.write_packed_varints(field_number, values, |v| {
            varint::zigzag_encode32(v) as u64
        });
    }

    /// Emit a packed sint64 run
    pub fn write_packed_sint64(&mut self, field_number: u32, values: &[i64]) {
        self.write_packed_varints(field_number, values, varint::zigzag_encode64);
    }

    /// Emit a packed fixed-width run
    fn write_packed_fixed<T: Copy, const W: usize>(
        &mut self,
        field_number: u32,
        values: &[T],
        to_bytes: fn(T) -> [u8; W],
    ) {
        if values.is_empty() {
            return;
        }
        self.write_tag(field_number, WireType::Delimited);
        varint::encode_u64((values.len() * W) as u64, &mut self.buf);
        for &value in values {
            self.buf.extend_from_slice(&to_bytes(value));
        }
    }

    /// Emit a packed fixed32 run
    pub fn write_packed_fixed32(&mut self, field_number: u32, values: &[u32]) {
        self.write_packed_fixed(field_number, values, u32::to_le_bytes);
    }

    /// Emit a packed sfixed32 run
    pub fn write_packed_sfixed32(&mut self, field_number: u32, values: &[i32]) {
        self.write_packed_fixed(field_number, values, i32::to_le_bytes);
    }

    /// Emit a packed fixed64 run
    pub fn write_packed_fixed64(&mut self, field_number: u32, values: &[u64]) {
        self.write_packed_fixed(field_number, values, u64::to_le_bytes);
    }

    /// Emit a packed sfixed64 run
    pub fn write_packed_sfixed64(&mut self, field_number: u32, values: &[i64]) {
        self.write_packed_fixed(field_number, values, i64::to_le_bytes);
    }

    /// Emit a packed float run
    pub fn write_packed_float(&mut self, field_number: u32, values: &[f32]) {
        self.write_packed_fixed(field_number, values, |v: f32| v.to_bits().to_le_bytes());
    }

    /// Emit a packed double run
    pub fn write_packed_double(&mut self, field_number: u32, values: &[f64]) {
        self.write_packed_fixed(field_number, values, |v: f64| v.to_bits().to_le_bytes());
    }

    /// Byte-copy one indexed occurrence out of the original buffer
    ///
    /// Re-emits the tag, then copies the payload span verbatim: varint
    /// bytes, fixed widths, length prefix plus payload, or group content
    /// through the matching end marker.
    pub fn write_raw_field(
        &mut self,
        cursor: &ByteCursor,
        field_number: u32,
        entry: IndexEntry,
    ) -> Result<()> {
        let wire_type = entry.wire_type();
        let start = entry.start();
        self.write_tag(field_number, wire_type);

        let end = match wire_type {
            WireType::Varint => cursor.varint64_at(start)?.1,
            WireType::Fixed32 => start + 4,
            WireType::Fixed64 => start + 8,
            WireType::Delimited => {
                let (len, payload_start) = cursor.varint64_at(start)?;
                payload_start + len as u32 as usize
            }
            WireType::StartGroup => read::group_span(cursor, start, field_number)?.1,
            WireType::EndGroup => return Err(Error::DecodeInvariant),
        };
        self.write_raw(&cursor.slice(start, end - start)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_scalar_field_emission() {
        let mut writer = Writer::new();
        writer.write_bool(1, true);
        writer.write_uint32(2, 150);
        assert_eq!(writer.into_bytes().as_ref(), &[0x08, 0x01, 0x10, 0x96, 0x01]);
    }

    #[test]
    fn test_negative_int32_five_bytes() {
        let mut writer = Writer::new();
        writer.write_int32(1, -1);
        assert_eq!(
            writer.into_bytes().as_ref(),
            &[0x08, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F]
        );
    }

    #[test]
    fn test_sint_zigzag_emission() {
        let mut writer = Writer::new();
        writer.write_sint32(1, -1);
        writer.write_sint64(2, 1);
        assert_eq!(writer.into_bytes().as_ref(), &[0x08, 0x01, 0x10, 0x02]);
    }

    #[test]
    fn test_delimited_emission() {
        let mut writer = Writer::new();
        writer.write_string(1, "ab");
        writer.write_delimited(2, b"");
        assert_eq!(
            writer.into_bytes().as_ref(),
            &[0x0A, 0x02, b'a', b'b', 0x12, 0x00]
        );
    }

    #[test]
    fn test_string_emission_multibyte() {
        // "é" is two UTF-8 bytes; the length prefix counts bytes, not chars
        let mut writer = Writer::new();
        writer.write_string(1, "é");
        assert_eq!(writer.into_bytes().as_ref(), &[0x0A, 0x02, 0xC3, 0xA9]);
    }

    #[test]
    fn test_group_emission() {
        let mut writer = Writer::new();
        writer.write_group(2, &[0x08, 0x01]);
        assert_eq!(writer.into_bytes().as_ref(), &[0x13, 0x08, 0x01, 0x14]);
    }

    #[test]
    fn test_packed_emission() {
        let mut writer = Writer::new();
        writer.write_packed_int32(1, &[1, 150]);
        assert_eq!(
            writer.into_bytes().as_ref(),
            &[0x0A, 0x03, 0x01, 0x96, 0x01]
        );

        let mut writer = Writer::new();
        writer.write_packed_fixed32(1, &[1]);
        assert_eq!(
            writer.into_bytes().as_ref(),
            &[0x0A, 0x04, 0x01, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_empty_packed_writes_nothing() {
        let mut writer = Writer::new();
        writer.write_packed_int32(1, &[]);
        writer.write_packed_double(2, &[]);
        assert!(writer.is_empty());
    }

    #[test]
    fn test_raw_field_copy_preserves_noncanonical_bytes() {
        // field 1 = varint 1 encoded with a redundant continuation byte
        let cursor = ByteCursor::new(vec![0x81, 0x00]);
        let mut writer = Writer::new();
        writer
            .write_raw_field(
                &cursor,
                1,
                IndexEntry::new(WireType::Varint, 0),
            )
            .unwrap();
        assert_eq!(writer.into_bytes().as_ref(), &[0x08, 0x81, 0x00]);
    }

    #[test]
    fn test_raw_field_copy_group() {
        // content of group 2 plus its end marker, preceded by nothing
        let cursor = ByteCursor::new(vec![0x08, 0x05, 0x14]);
        let mut writer = Writer::new();
        writer
            .write_raw_field(&cursor, 2, IndexEntry::new(WireType::StartGroup, 0))
            .unwrap();
        assert_eq!(writer.into_bytes().as_ref(), &[0x13, 0x08, 0x05, 0x14]);
    }
}

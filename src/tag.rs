//! Wire-tag codec: (field number, wire type) packing and field skipping
//!
//! Every field on the wire starts with a varint tag of the form
//! `field_number << 3 | wire_type`. Skipping dispatches on the wire type;
//! legacy groups are skipped recursively until the matching end marker.

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::MAX_FIELD_NUMBER;

/// 3-bit wire type identifying a field's on-wire encoding shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    /// Base-128 varint payload
    Varint = 0,
    /// 8-byte little-endian payload
    Fixed64 = 1,
    /// Length-prefixed payload
    Delimited = 2,
    /// Legacy group start marker
    StartGroup = 3,
    /// Legacy group end marker
    EndGroup = 4,
    /// 4-byte little-endian payload
    Fixed32 = 5,
}

impl TryFrom<u8> for WireType {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::Delimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::Fixed32),
            other => Err(Error::InvalidWireType(other)),
        }
    }
}

/// Pack a field number and wire type into a tag value
#[inline]
pub const fn make_tag(field_number: u32, wire_type: WireType) -> u32 {
    (field_number << 3) | wire_type as u32
}

/// Field number half of a tag
#[inline]
pub const fn tag_field_number(tag: u32) -> u32 {
    tag >> 3
}

/// Wire type half of a tag
#[inline]
pub fn tag_wire_type(tag: u32) -> Result<WireType> {
    WireType::try_from((tag & 0x07) as u8)
}

/// Read a tag at the cursor position and advance past it
///
/// The tag varint is read with 32-bit truncation; a valid tag never needs
/// more than 32 significant bits.
#[inline]
pub fn read_tag(cursor: &mut ByteCursor) -> Result<(u32, WireType)> {
    let tag = cursor.varint32()?;
    let field_number = tag_field_number(tag);
    if field_number == 0 || field_number > MAX_FIELD_NUMBER {
        return Err(Error::InvalidFieldNumber(field_number));
    }
    Ok((field_number, tag_wire_type(tag)?))
}

/// Skip one field payload, dispatching on the wire type
///
/// The cursor must sit just past the field's tag. For `StartGroup` the
/// cursor lands exactly past the matching end marker, recursing through
/// nested groups of other field numbers on the way.
pub fn skip_field(cursor: &mut ByteCursor, wire_type: WireType, field_number: u32) -> Result<()> {
    match wire_type {
        WireType::Varint => cursor.skip_varint(),
        WireType::Fixed64 => cursor.skip(8),
        WireType::Fixed32 => cursor.skip(4),
        WireType::Delimited => {
            let len = cursor.varint32()? as usize;
            cursor.skip(len)
        }
        WireType::StartGroup => skip_group(cursor, field_number),
        WireType::EndGroup => Err(Error::UnexpectedEndGroup),
    }
}

/// Skip group content until the end marker matching `field_number`
fn skip_group(cursor: &mut ByteCursor, field_number: u32) -> Result<()> {
    loop {
        if !cursor.has_remaining() {
            return Err(Error::MissingEndGroup);
        }
        let (number, wire_type) = read_tag(cursor)?;
        if wire_type == WireType::EndGroup {
            if number == field_number {
                return Ok(());
            }
            return Err(Error::UnmatchedEndGroup {
                expected: field_number,
                found: number,
            });
        }
        skip_field(cursor, wire_type, number)?;
    }
}

//! Variable-length integer encoding (base-128 varints)
//!
//! Protobuf varints carry 7 payload bits per byte with the high bit as the
//! continuation flag. A 64-bit value occupies at most 10 bytes; a varint
//! that continues past the 10th byte is malformed.

use alloc::vec::Vec;

use crate::error::{Error, Result};

/// Maximum bytes needed for a 32-bit varint
pub const MAX_VARINT32_SIZE: usize = 5;

/// Maximum bytes needed for a 64-bit varint
pub const MAX_VARINT64_SIZE: usize = 10;

/// Decode a u64 varint from the given buffer
///
/// Returns (value, bytes_consumed). High-order bits past 64 in the final
/// byte are discarded, matching wire-format sign-extension behavior.
#[inline]
pub fn decode_u64(buf: &[u8]) -> Result<(u64, usize)> {
    let mut result = 0u64;
    let mut pos = 0;

    loop {
        if pos >= buf.len() {
            return Err(Error::UnexpectedEof);
        }
        if pos >= MAX_VARINT64_SIZE {
            return Err(Error::InvalidVarint);
        }

        let byte = buf[pos];
        if pos < 9 {
            result |= ((byte & 0x7F) as u64) << (7 * pos);
        } else {
            // 10th byte: only the lowest bit still fits in 64 bits.
            result |= ((byte & 0x01) as u64) << 63;
        }
        pos += 1;

        if byte & 0x80 == 0 {
            return Ok((result, pos));
        }
    }
}

/// Decode a varint and truncate it to its low 32 bits
///
/// The full (up to 10-byte) varint is consumed and validated even when the
/// value does not fit in 32 bits. Writers may sign-extend negative 32-bit
/// values to 10 bytes; readers always truncate.
#[inline]
pub fn decode_u32(buf: &[u8]) -> Result<(u32, usize)> {
    let (value, consumed) = decode_u64(buf)?;
    Ok((value as u32, consumed))
}

/// Encode a u64 as a varint, appending to the given vector
///
/// Returns the number of bytes written.
#[inline]
pub fn encode_u64(value: u64, out: &mut Vec<u8>) -> usize {
    let mut value = value;
    let mut written = 1;

    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
        written += 1;
    }
    out.push(value as u8);
    written
}

/// Encode a u32 as a varint, appending to the given vector
#[inline]
pub fn encode_u32(value: u32, out: &mut Vec<u8>) -> usize {
    encode_u64(value as u64, out)
}

/// Encode an i32 as a varint using 32-bit sign extension
///
/// Negative values always occupy 5 bytes on the wire; readers truncate
/// back to the low 32 bits.
#[inline]
pub fn encode_i32(value: i32, out: &mut Vec<u8>) -> usize {
    encode_u64(value as u32 as u64, out)
}

/// Encoded byte length of a u64 varint
#[inline]
pub const fn length_u64(value: u64) -> usize {
    // 1 byte per started 7-bit group
    match value {
        0 => 1,
        v => (64 - v.leading_zeros() as usize + 6) / 7,
    }
}

/// Encoded byte length of an i32 varint (negatives always take 5 bytes)
#[inline]
pub const fn length_i32(value: i32) -> usize {
    length_u64(value as u32 as u64)
}

/// Zig-zag encode a signed 32-bit value
#[inline]
pub const fn zigzag_encode32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Zig-zag decode to a signed 32-bit value
#[inline]
pub const fn zigzag_decode32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Zig-zag encode a signed 64-bit value
#[inline]
pub const fn zigzag_encode64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Zig-zag decode to a signed 64-bit value
#[inline]
pub const fn zigzag_decode64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

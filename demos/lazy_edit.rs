//! Demo: edit one field of a message while leaving the rest untouched
//!
//! Run with: cargo run --example lazy_edit

use lazywire::{Kernel, Result};

fn main() -> Result<()> {
    // An encoded message from "somewhere else": field 1 uses a redundant
    // two-byte varint encoding, field 2 is a string, field 3 a legacy group.
    let wire: &[u8] = &[
        0x08, 0x81, 0x00, // field 1: varint 1, non-canonical encoding
        0x12, 0x05, b'h', b'e', b'l', b'l', b'o', // field 2: "hello"
        0x1B, 0x08, 0x2A, 0x1C, // field 3: group { 1: 42 }
    ];

    let mut kernel = Kernel::from_bytes(wire);

    // Reads decode lazily and cache; they never perturb the original bytes.
    println!("field 1 = {}", kernel.get_int32(1, 0)?);
    println!("field 2 = {:?}", kernel.get_string(2, "")?);
    let group = kernel.group(3)?;
    println!("field 3.1 = {}", group.borrow_mut().get_int32(1, 0)?);

    // Only the written field is re-encoded; everything else is byte-copied,
    // including the non-canonical varint and the group.
    kernel.set_string(2, "world")?;
    let out = kernel.serialize()?;
    println!("re-encoded: {out:02X?}");

    assert_eq!(&out[..3], &wire[..3]);
    assert_eq!(&out[out.len() - 4..], &wire[wire.len() - 4..]);
    Ok(())
}

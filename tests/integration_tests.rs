//! Integration tests for lazywire
//!
//! These tests exercise the full lazy pipeline end to end: index, decode,
//! cache, mutate and serialize.

use lazywire::*;

/// Build an encoded message through the writer-backed setters only.
fn sample_message() -> bytes::Bytes {
    let mut kernel = Kernel::empty();
    kernel.set_int32(1, 42).unwrap();
    kernel.set_string(2, "hello").unwrap();
    kernel.set_packed_uint32(3, vec![1, 2, 300]).unwrap();
    kernel.set_double(4, 2.5).unwrap();
    kernel.set_bytes(5, &b"\x00\xFF"[..]).unwrap();
    kernel.serialize().unwrap()
}

#[test]
fn test_full_round_trip_through_reparse() {
    let bytes = sample_message();
    let mut kernel = Kernel::from_bytes(bytes.clone());

    assert_eq!(kernel.get_int32(1, 0).unwrap(), 42);
    assert_eq!(kernel.get_string(2, "").unwrap(), "hello");
    assert_eq!(kernel.repeated_uint32(3).unwrap(), [1, 2, 300]);
    assert_eq!(kernel.get_double(4, 0.0).unwrap(), 2.5);
    assert_eq!(kernel.get_bytes(5, bytes::Bytes::new()).unwrap().as_ref(), b"\x00\xFF");

    // All those reads changed nothing.
    assert_eq!(kernel.serialize().unwrap(), bytes);
}

#[test]
fn test_untouched_unknown_fields_survive_edits() {
    // A message with fields this "schema" never touches keeps them verbatim,
    // including a group and a non-canonical varint.
    let mut data = Vec::new();
    data.extend_from_slice(&[0x08, 0x81, 0x00]); // field 1: varint 1 (2-byte encoding)
    data.extend_from_slice(&[0x13, 0x08, 0x05, 0x14]); // field 2: group { 1: 5 }
    data.extend_from_slice(&[0x1A, 0x01, 0x61]); // field 3: "a"

    let mut kernel = Kernel::from_bytes(data);
    kernel.set_string(3, "b").unwrap();

    assert_eq!(
        kernel.serialize().unwrap().as_ref(),
        &[0x08, 0x81, 0x00, 0x13, 0x08, 0x05, 0x14, 0x1A, 0x01, 0x62]
    );
}

#[test]
fn test_nested_message_edit_chain() {
    // outer { 1: inner { 1: inner2 { 1: 1 } } }
    let mut inner2 = Kernel::empty();
    inner2.set_int32(1, 1).unwrap();
    let mut inner = Kernel::empty();
    inner
        .set_message(1, std::rc::Rc::new(core::cell::RefCell::new(inner2)))
        .unwrap();
    let mut outer = Kernel::empty();
    outer
        .set_message(1, std::rc::Rc::new(core::cell::RefCell::new(inner)))
        .unwrap();
    let bytes = outer.serialize().unwrap();
    assert_eq!(bytes.as_ref(), &[0x0A, 0x04, 0x0A, 0x02, 0x08, 0x01]);

    // Reparse and edit two levels deep through mutable handles.
    let mut outer = Kernel::from_bytes(bytes);
    let inner = outer.message_or_null(1).unwrap().unwrap();
    let inner2 = inner.borrow_mut().message_or_null(1).unwrap().unwrap();
    inner2.borrow_mut().set_int32(1, 7).unwrap();

    assert_eq!(
        outer.serialize().unwrap().as_ref(),
        &[0x0A, 0x04, 0x0A, 0x02, 0x08, 0x07]
    );
}

#[test]
fn test_shallow_copy_shares_descendants() {
    let mut kernel = Kernel::from_bytes(vec![0x0A, 0x02, 0x08, 0x01]);
    let child = kernel.message_or_null(1).unwrap().unwrap();

    let copy = kernel.shallow_copy();
    // The copy shares the cached child handle: mutating the child through
    // the original is visible in the copy's output too.
    child.borrow_mut().set_int32(1, 9).unwrap();
    assert_eq!(
        copy.serialize().unwrap().as_ref(),
        &[0x0A, 0x02, 0x08, 0x09]
    );
}

#[test]
fn test_shallow_copy_top_level_isolation() {
    let mut kernel = Kernel::from_bytes(vec![0x08, 0x01, 0x10, 0x02]);
    let mut copy = kernel.shallow_copy();

    copy.clear_field(1).unwrap();
    copy.set_int32(2, 9).unwrap();

    assert_eq!(
        kernel.serialize().unwrap().as_ref(),
        &[0x08, 0x01, 0x10, 0x02]
    );
    assert_eq!(copy.serialize().unwrap().as_ref(), &[0x10, 0x09]);
    assert_eq!(kernel.get_int32(1, 0).unwrap(), 1);
}

#[test]
fn test_varint_limits() {
    // All-0xFF 9 bytes plus final 0x01: -1 over the full 64-bit range.
    let mut data = vec![0x08];
    data.extend_from_slice(&[0xFF; 9]);
    data.push(0x01);
    let mut kernel = Kernel::from_bytes(data);
    assert_eq!(kernel.get_int64(1, 0).unwrap(), -1);

    // An 11th continuation byte is malformed.
    let mut data = vec![0x08];
    data.extend_from_slice(&[0xFF; 10]);
    data.push(0x01);
    let mut kernel = Kernel::from_bytes(data);
    assert_eq!(kernel.get_int64(1, 0).unwrap_err(), Error::InvalidVarint);
}

#[test]
fn test_zigzag_accessors() {
    let mut kernel = Kernel::empty();
    kernel.set_sint32(1, -1).unwrap();
    kernel.set_sint64(2, i64::MIN).unwrap();
    let bytes = kernel.serialize().unwrap();
    assert_eq!(&bytes[..2], &[0x08, 0x01]);

    let mut back = Kernel::from_bytes(bytes);
    assert_eq!(back.get_sint32(1, 0).unwrap(), -1);
    assert_eq!(back.get_sint64(2, 0).unwrap(), i64::MIN);
}

#[test]
fn test_fixed_width_accessors() {
    let mut kernel = Kernel::empty();
    kernel.set_fixed32(1, u32::MAX).unwrap();
    kernel.set_sfixed32(2, -5).unwrap();
    kernel.set_fixed64(3, u64::MAX).unwrap();
    kernel.set_sfixed64(4, -5).unwrap();
    kernel.set_float(5, -1.5).unwrap();

    let mut back = Kernel::from_bytes(kernel.serialize().unwrap());
    assert_eq!(back.get_fixed32(1, 0).unwrap(), u32::MAX);
    assert_eq!(back.get_sfixed32(2, 0).unwrap(), -5);
    assert_eq!(back.get_fixed64(3, 0).unwrap(), u64::MAX);
    assert_eq!(back.get_sfixed64(4, 0).unwrap(), -5);
    assert_eq!(back.get_float(5, 0.0).unwrap(), -1.5);
}

#[test]
fn test_repeated_strings_and_bytes() {
    let mut kernel = Kernel::empty();
    kernel.add_string(1, "a").unwrap();
    kernel.add_string(1, "b").unwrap();
    kernel.add_bytes(2, &[0u8, 1][..]).unwrap();

    let mut back = Kernel::from_bytes(kernel.serialize().unwrap());
    assert_eq!(back.repeated_string(1).unwrap(), ["a", "b"]);
    assert_eq!(back.repeated_bytes(2).unwrap().len(), 1);
}

#[test]
fn test_repeated_groups() {
    let mut kernel = Kernel::empty();
    for value in [1, 2] {
        let mut entry = Kernel::empty();
        entry.set_int32(1, value).unwrap();
        kernel
            .add_group(2, std::rc::Rc::new(core::cell::RefCell::new(entry)))
            .unwrap();
    }
    let bytes = kernel.serialize().unwrap();
    assert_eq!(
        bytes.as_ref(),
        &[0x13, 0x08, 0x01, 0x14, 0x13, 0x08, 0x02, 0x14]
    );

    let mut back = Kernel::from_bytes(bytes);
    let groups = back.repeated_group(2).unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[1].borrow_mut().get_int32(1, 0).unwrap(), 2);
}

#[test]
fn test_message_set_end_to_end() {
    let mut set = MessageSet::empty();
    let mut payload = Kernel::empty();
    payload.set_string(1, "extension").unwrap();
    set.set_message(1001, payload.serialize().unwrap()).unwrap();

    let bytes = set.serialize().unwrap();
    let mut back = MessageSet::from_bytes(bytes).unwrap();
    assert_eq!(back.type_ids(), [1001]);

    let mut payload = Kernel::from_bytes(back.message(1001).unwrap().unwrap());
    assert_eq!(payload.get_string(1, "").unwrap(), "extension");
}

#[test]
fn test_large_field_numbers() {
    let mut kernel = Kernel::empty();
    kernel.set_int32(MAX_FIELD_NUMBER, 1).unwrap();
    kernel.set_int32(25, 2).unwrap();

    let mut back = Kernel::from_bytes(kernel.serialize().unwrap());
    assert_eq!(back.get_int32(MAX_FIELD_NUMBER, 0).unwrap(), 1);
    assert_eq!(back.get_int32(25, 0).unwrap(), 2);
}

//! Lazy message kernel: get/set/has/clear/serialize over indexed bytes
//!
//! A [`Kernel`] owns the original buffer, a pivot-partitioned slot container
//! and nothing else. Indexing is deferred to the first field access; decoding
//! is deferred to the first typed read of each field. Reads cache the decoded
//! value while keeping the original bytes authoritative, so a kernel that is
//! only read serializes back byte-for-byte. Writes install a re-encoder and
//! drop the raw bytes for that field only.
//!
//! Enum fields have no accessor family of their own; they share the int32
//! accessors, which match their wire shape exactly.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use bytes::Bytes;
use core::cell::RefCell;

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::field::{Field, FieldEncoder, IndexEntry, MessageHandle, Storage, Value, DEFAULT_PIVOT};
use crate::index::build_index;
use crate::read;
use crate::tag::WireType;
use crate::write::Writer;
use crate::MAX_FIELD_NUMBER;

/// Lazily indexed, lazily decoded wire-format message
#[derive(Debug, Clone)]
pub struct Kernel {
    buffer: Option<ByteCursor>,
    fields: Option<Storage>,
    pivot: u32,
}

#[inline]
fn check_field_number(field_number: u32) -> Result<()> {
    if field_number == 0 || field_number > MAX_FIELD_NUMBER {
        return Err(Error::InvalidFieldNumber(field_number));
    }
    Ok(())
}

#[inline]
fn new_handle(kernel: Kernel) -> MessageHandle {
    Rc::new(RefCell::new(kernel))
}

fn store_cached(storage: &mut Storage, field_number: u32, value: Value, encoder: FieldEncoder) {
    // A write unconditionally replaces the slot: fresh value, fresh encoder,
    // raw entries dropped.
    storage.set(field_number, Field::Cached { value, encoder });
}

/// Concatenate all delimited occurrences of a message field into one region
///
/// Multiple occurrences of a message field deep-merge: the concatenation of
/// their payloads is decoded as a single message.
fn merged_delimited(cursor: &ByteCursor, entries: &[IndexEntry]) -> Result<ByteCursor> {
    let mut regions = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.wire_type() != WireType::Delimited {
            return Err(Error::WireTypeMismatch {
                expected: WireType::Delimited,
                found: entry.wire_type(),
            });
        }
        regions.push(read::delimited_at(cursor, entry.start())?);
    }
    if regions.len() == 1 {
        let mut region = regions;
        Ok(region.remove(0))
    } else {
        Ok(ByteCursor::merge(&regions))
    }
}

/// Concatenate all group occurrences of a field into one content region
fn merged_group(cursor: &ByteCursor, entries: &[IndexEntry], field_number: u32) -> Result<ByteCursor> {
    let mut regions = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.wire_type() != WireType::StartGroup {
            return Err(Error::WireTypeMismatch {
                expected: WireType::StartGroup,
                found: entry.wire_type(),
            });
        }
        regions.push(read::group_at(cursor, entry.start(), field_number)?);
    }
    if regions.len() == 1 {
        let mut region = regions;
        Ok(region.remove(0))
    } else {
        Ok(ByteCursor::merge(&regions))
    }
}

// Encoder functions installed by setters and mutable accessors. Each one
// re-emits a single field from its cached value during serialization.

fn encode_string(writer: &mut Writer, field_number: u32, value: &Value) -> Result<()> {
    match value {
        Value::Str(v) => {
            writer.write_string(field_number, v);
            Ok(())
        }
        _ => Err(Error::TypeMismatch),
    }
}

fn encode_repeated_string(writer: &mut Writer, field_number: u32, value: &Value) -> Result<()> {
    match value {
        Value::StrList(list) => {
            for v in list {
                writer.write_string(field_number, v);
            }
            Ok(())
        }
        _ => Err(Error::TypeMismatch),
    }
}

fn encode_bytes(writer: &mut Writer, field_number: u32, value: &Value) -> Result<()> {
    match value {
        Value::Bytes(v) => {
            writer.write_delimited(field_number, v);
            Ok(())
        }
        _ => Err(Error::TypeMismatch),
    }
}

fn encode_repeated_bytes(writer: &mut Writer, field_number: u32, value: &Value) -> Result<()> {
    match value {
        Value::BytesList(list) => {
            for v in list {
                writer.write_delimited(field_number, v);
            }
            Ok(())
        }
        _ => Err(Error::TypeMismatch),
    }
}

fn encode_message(writer: &mut Writer, field_number: u32, value: &Value) -> Result<()> {
    match value {
        Value::Message(handle) => {
            let child = handle
                .try_borrow()
                .map_err(|_| Error::ReadOnlyAliased(field_number))?;
            let payload = child.serialize()?;
            writer.write_delimited(field_number, &payload);
            Ok(())
        }
        _ => Err(Error::TypeMismatch),
    }
}

fn encode_repeated_message(writer: &mut Writer, field_number: u32, value: &Value) -> Result<()> {
    match value {
        Value::MessageList(list) => {
            for handle in list {
                let child = handle
                    .try_borrow()
                    .map_err(|_| Error::ReadOnlyAliased(field_number))?;
                let payload = child.serialize()?;
                writer.write_delimited(field_number, &payload);
            }
            Ok(())
        }
        _ => Err(Error::TypeMismatch),
    }
}

fn encode_group(writer: &mut Writer, field_number: u32, value: &Value) -> Result<()> {
    match value {
        Value::Message(handle) => {
            let child = handle
                .try_borrow()
                .map_err(|_| Error::ReadOnlyAliased(field_number))?;
            let content = child.serialize()?;
            writer.write_group(field_number, &content);
            Ok(())
        }
        _ => Err(Error::TypeMismatch),
    }
}

fn encode_repeated_group(writer: &mut Writer, field_number: u32, value: &Value) -> Result<()> {
    match value {
        Value::MessageList(list) => {
            for handle in list {
                let child = handle
                    .try_borrow()
                    .map_err(|_| Error::ReadOnlyAliased(field_number))?;
                let content = child.serialize()?;
                writer.write_group(field_number, &content);
            }
            Ok(())
        }
        _ => Err(Error::TypeMismatch),
    }
}

/// Singular accessor family for one Copy scalar type
macro_rules! scalar_accessors {
    (
        $get:ident, $set:ident, $enc:ident,
        $ty:ty, $variant:ident, $wire:expr, $read:path, $write:ident,
        $kind:literal
    ) => {
        fn $enc(writer: &mut Writer, field_number: u32, value: &Value) -> Result<()> {
            match value {
                Value::$variant(v) => {
                    writer.$write(field_number, *v);
                    Ok(())
                }
                _ => Err(Error::TypeMismatch),
            }
        }

        impl Kernel {
            #[doc = concat!("Read the ", $kind, " field, or `default` when absent")]
            #[doc = ""]
            #[doc = "With multiple occurrences on the wire, the last one wins."]
            pub fn $get(&mut self, field_number: u32, default: $ty) -> Result<$ty> {
                check_field_number(field_number)?;
                let buffer = self.buffer.clone();
                let fields = self.fields_mut()?;
                let field = match fields.get_mut(field_number) {
                    Some(field) => field,
                    None => return Ok(default),
                };
                if let Some(value) = field.decoded_value() {
                    return match value {
                        Value::$variant(v) => Ok(*v),
                        _ => Err(Error::TypeMismatch),
                    };
                }
                let entries = field.index_entries().ok_or(Error::DecodeInvariant)?;
                let entry = *entries.last().ok_or(Error::DecodeInvariant)?;
                if entry.wire_type() != $wire {
                    return Err(Error::WireTypeMismatch {
                        expected: $wire,
                        found: entry.wire_type(),
                    });
                }
                let cursor = buffer.as_ref().ok_or(Error::DecodeInvariant)?;
                let value = $read(cursor, entry.start())?;
                field.cache_decoded(Value::$variant(value));
                Ok(value)
            }

            #[doc = concat!("Write the ", $kind, " field, replacing any prior occurrences")]
            pub fn $set(&mut self, field_number: u32, value: $ty) -> Result<()> {
                check_field_number(field_number)?;
                let fields = self.fields_mut()?;
                store_cached(fields, field_number, Value::$variant(value), $enc);
                Ok(())
            }
        }
    };
}

/// Repeated accessor family for one Copy scalar type
macro_rules! repeated_scalar_accessors {
    (
        $get:ident, $set_packed:ident, $set_unpacked:ident,
        $add_packed:ident, $add_unpacked:ident,
        $enc_packed:ident, $enc_unpacked:ident,
        $ty:ty, $list:ident, $wire:expr,
        $read:path, $read_packed:path, $write:ident, $write_packed:ident,
        $kind:literal
    ) => {
        fn $enc_packed(writer: &mut Writer, field_number: u32, value: &Value) -> Result<()> {
            match value {
                Value::$list(list) => {
                    writer.$write_packed(field_number, list);
                    Ok(())
                }
                _ => Err(Error::TypeMismatch),
            }
        }

        fn $enc_unpacked(writer: &mut Writer, field_number: u32, value: &Value) -> Result<()> {
            match value {
                Value::$list(list) => {
                    for &v in list {
                        writer.$write(field_number, v);
                    }
                    Ok(())
                }
                _ => Err(Error::TypeMismatch),
            }
        }

        impl Kernel {
            #[doc = concat!("Read all ", $kind, " elements, packed and unpacked occurrences combined")]
            pub fn $get(&mut self, field_number: u32) -> Result<Vec<$ty>> {
                check_field_number(field_number)?;
                let buffer = self.buffer.clone();
                let fields = self.fields_mut()?;
                let field = match fields.get_mut(field_number) {
                    Some(field) => field,
                    None => return Ok(Vec::new()),
                };
                if let Some(value) = field.decoded_value() {
                    return match value {
                        Value::$list(list) => Ok(list.clone()),
                        _ => Err(Error::TypeMismatch),
                    };
                }
                let entries = field.index_entries().ok_or(Error::DecodeInvariant)?;
                let cursor = buffer.as_ref().ok_or(Error::DecodeInvariant)?;
                let mut list = Vec::new();
                for entry in entries {
                    match entry.wire_type() {
                        WireType::Delimited => list.extend($read_packed(cursor, entry.start())?),
                        wt if wt == $wire => list.push($read(cursor, entry.start())?),
                        wt => {
                            return Err(Error::WireTypeMismatch {
                                expected: $wire,
                                found: wt,
                            })
                        }
                    }
                }
                field.cache_decoded(Value::$list(list.clone()));
                Ok(list)
            }

            #[doc = concat!("Replace the field with a packed run of ", $kind, " elements")]
            pub fn $set_packed(&mut self, field_number: u32, values: Vec<$ty>) -> Result<()> {
                check_field_number(field_number)?;
                let fields = self.fields_mut()?;
                store_cached(fields, field_number, Value::$list(values), $enc_packed);
                Ok(())
            }

            #[doc = concat!("Replace the field with one tagged occurrence per ", $kind, " element")]
            pub fn $set_unpacked(&mut self, field_number: u32, values: Vec<$ty>) -> Result<()> {
                check_field_number(field_number)?;
                let fields = self.fields_mut()?;
                store_cached(fields, field_number, Value::$list(values), $enc_unpacked);
                Ok(())
            }

            #[doc = concat!("Append one element; the field re-serializes packed")]
            pub fn $add_packed(&mut self, field_number: u32, value: $ty) -> Result<()> {
                let mut list = self.$get(field_number)?;
                list.push(value);
                self.$set_packed(field_number, list)
            }

            #[doc = concat!("Append one element; the field re-serializes unpacked")]
            pub fn $add_unpacked(&mut self, field_number: u32, value: $ty) -> Result<()> {
                let mut list = self.$get(field_number)?;
                list.push(value);
                self.$set_unpacked(field_number, list)
            }
        }
    };
}

impl Kernel {
    /// Create a kernel over encoded bytes with the default pivot
    ///
    /// Nothing is scanned here; the index is built on first field access.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::from_bytes_with_pivot(data, DEFAULT_PIVOT)
    }

    /// Create a kernel over encoded bytes with an explicit pivot
    pub fn from_bytes_with_pivot(data: impl Into<Bytes>, pivot: u32) -> Self {
        Self::from_cursor(ByteCursor::new(data), pivot)
    }

    pub(crate) fn from_cursor(cursor: ByteCursor, pivot: u32) -> Self {
        Kernel {
            buffer: Some(cursor),
            fields: None,
            pivot,
        }
    }

    /// Create an empty kernel with the default pivot
    pub fn empty() -> Self {
        Self::empty_with_pivot(DEFAULT_PIVOT)
    }

    /// Create an empty kernel with an explicit pivot
    pub fn empty_with_pivot(pivot: u32) -> Self {
        Kernel {
            buffer: None,
            fields: Some(Storage::with_pivot(pivot)),
            pivot,
        }
    }

    /// The array/map partition threshold, propagated to nested kernels
    #[inline]
    pub fn pivot(&self) -> u32 {
        self.pivot
    }

    /// Build the field index if it has not been built yet
    fn fields_mut(&mut self) -> Result<&mut Storage> {
        if self.fields.is_none() {
            let storage = match &self.buffer {
                Some(cursor) => build_index(cursor, self.pivot)?,
                None => Storage::with_pivot(self.pivot),
            };
            self.fields = Some(storage);
        }
        match self.fields.as_mut() {
            Some(fields) => Ok(fields),
            None => Err(Error::DecodeInvariant),
        }
    }

    /// True when the field is present; an empty repeated cache reads as absent
    pub fn has_field(&mut self, field_number: u32) -> Result<bool> {
        check_field_number(field_number)?;
        let fields = self.fields_mut()?;
        Ok(match fields.get(field_number) {
            None => false,
            Some(field) => match field.decoded_value() {
                Some(value) => !value.is_empty_list(),
                None => true,
            },
        })
    }

    /// Remove the field entirely; independent across shallow copies
    pub fn clear_field(&mut self, field_number: u32) -> Result<()> {
        check_field_number(field_number)?;
        self.fields_mut()?.remove(field_number);
        Ok(())
    }

    /// Slot-level copy of this kernel
    ///
    /// O(top-level fields), non-recursive: cached sub-message handles are
    /// shared between original and copy, scalar list caches are duplicated.
    /// Mutating a field two or more levels deep through a copy still
    /// mutates the shared descendant.
    pub fn shallow_copy(&self) -> Kernel {
        Kernel {
            buffer: self.buffer.clone(),
            fields: self.fields.as_ref().map(Storage::shallow_copy),
            pivot: self.pivot,
        }
    }

    /// Serialize the message back to bytes
    ///
    /// Fields that were written re-encode through their installed encoder;
    /// everything else is byte-copied verbatim from the original buffer.
    /// A kernel that was never accessed copies its whole buffer unchanged.
    pub fn serialize(&self) -> Result<Bytes> {
        let fields = match &self.fields {
            None => {
                return Ok(self
                    .buffer
                    .as_ref()
                    .map(ByteCursor::as_bytes)
                    .unwrap_or_default())
            }
            Some(fields) => fields,
        };

        let mut writer = Writer::new();
        for (field_number, field) in fields.iter() {
            if let Some(encoder) = field.encoder() {
                let value = field.decoded_value().ok_or(Error::DecodeInvariant)?;
                encoder(&mut writer, field_number, value)?;
            } else {
                let entries = field.index_entries().ok_or(Error::DecodeInvariant)?;
                let cursor = self.buffer.as_ref().ok_or(Error::DecodeInvariant)?;
                for entry in entries {
                    writer.write_raw_field(cursor, field_number, *entry)?;
                }
            }
        }
        Ok(writer.into_bytes())
    }

    // -- string and bytes fields --------------------------------------------

    /// Read the string field, or `default` when absent
    pub fn get_string(&mut self, field_number: u32, default: &str) -> Result<String> {
        check_field_number(field_number)?;
        let buffer = self.buffer.clone();
        let fields = self.fields_mut()?;
        let field = match fields.get_mut(field_number) {
            Some(field) => field,
            None => return Ok(String::from(default)),
        };
        if let Some(value) = field.decoded_value() {
            return match value {
                Value::Str(v) => Ok(v.clone()),
                _ => Err(Error::TypeMismatch),
            };
        }
        let entries = field.index_entries().ok_or(Error::DecodeInvariant)?;
        let entry = *entries.last().ok_or(Error::DecodeInvariant)?;
        if entry.wire_type() != WireType::Delimited {
            return Err(Error::WireTypeMismatch {
                expected: WireType::Delimited,
                found: entry.wire_type(),
            });
        }
        let cursor = buffer.as_ref().ok_or(Error::DecodeInvariant)?;
        let value = read::string_at(cursor, entry.start())?;
        field.cache_decoded(Value::Str(value.clone()));
        Ok(value)
    }

    /// Write the string field, replacing any prior occurrences
    pub fn set_string(&mut self, field_number: u32, value: impl Into<String>) -> Result<()> {
        check_field_number(field_number)?;
        let fields = self.fields_mut()?;
        store_cached(fields, field_number, Value::Str(value.into()), encode_string);
        Ok(())
    }

    /// Read all string elements of a repeated field
    pub fn repeated_string(&mut self, field_number: u32) -> Result<Vec<String>> {
        check_field_number(field_number)?;
        let buffer = self.buffer.clone();
        let fields = self.fields_mut()?;
        let field = match fields.get_mut(field_number) {
            Some(field) => field,
            None => return Ok(Vec::new()),
        };
        if let Some(value) = field.decoded_value() {
            return match value {
                Value::StrList(list) => Ok(list.clone()),
                _ => Err(Error::TypeMismatch),
            };
        }
        let entries = field.index_entries().ok_or(Error::DecodeInvariant)?;
        let cursor = buffer.as_ref().ok_or(Error::DecodeInvariant)?;
        let mut list = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.wire_type() != WireType::Delimited {
                return Err(Error::WireTypeMismatch {
                    expected: WireType::Delimited,
                    found: entry.wire_type(),
                });
            }
            list.push(read::string_at(cursor, entry.start())?);
        }
        field.cache_decoded(Value::StrList(list.clone()));
        Ok(list)
    }

    /// Replace the repeated string field
    pub fn set_repeated_string(&mut self, field_number: u32, values: Vec<String>) -> Result<()> {
        check_field_number(field_number)?;
        let fields = self.fields_mut()?;
        store_cached(
            fields,
            field_number,
            Value::StrList(values),
            encode_repeated_string,
        );
        Ok(())
    }

    /// Append one string element
    pub fn add_string(&mut self, field_number: u32, value: impl Into<String>) -> Result<()> {
        let mut list = self.repeated_string(field_number)?;
        list.push(value.into());
        self.set_repeated_string(field_number, list)
    }

    /// Read the bytes field, or `default` when absent
    pub fn get_bytes(&mut self, field_number: u32, default: Bytes) -> Result<Bytes> {
        check_field_number(field_number)?;
        let buffer = self.buffer.clone();
        let fields = self.fields_mut()?;
        let field = match fields.get_mut(field_number) {
            Some(field) => field,
            None => return Ok(default),
        };
        if let Some(value) = field.decoded_value() {
            return match value {
                Value::Bytes(v) => Ok(v.clone()),
                _ => Err(Error::TypeMismatch),
            };
        }
        let entries = field.index_entries().ok_or(Error::DecodeInvariant)?;
        let entry = *entries.last().ok_or(Error::DecodeInvariant)?;
        if entry.wire_type() != WireType::Delimited {
            return Err(Error::WireTypeMismatch {
                expected: WireType::Delimited,
                found: entry.wire_type(),
            });
        }
        let cursor = buffer.as_ref().ok_or(Error::DecodeInvariant)?;
        let value = read::bytes_at(cursor, entry.start())?;
        field.cache_decoded(Value::Bytes(value.clone()));
        Ok(value)
    }

    /// Write the bytes field, replacing any prior occurrences
    pub fn set_bytes(&mut self, field_number: u32, value: impl Into<Bytes>) -> Result<()> {
        check_field_number(field_number)?;
        let fields = self.fields_mut()?;
        store_cached(fields, field_number, Value::Bytes(value.into()), encode_bytes);
        Ok(())
    }

    /// Read all bytes elements of a repeated field
    pub fn repeated_bytes(&mut self, field_number: u32) -> Result<Vec<Bytes>> {
        check_field_number(field_number)?;
        let buffer = self.buffer.clone();
        let fields = self.fields_mut()?;
        let field = match fields.get_mut(field_number) {
            Some(field) => field,
            None => return Ok(Vec::new()),
        };
        if let Some(value) = field.decoded_value() {
            return match value {
                Value::BytesList(list) => Ok(list.clone()),
                _ => Err(Error::TypeMismatch),
            };
        }
        let entries = field.index_entries().ok_or(Error::DecodeInvariant)?;
        let cursor = buffer.as_ref().ok_or(Error::DecodeInvariant)?;
        let mut list = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.wire_type() != WireType::Delimited {
                return Err(Error::WireTypeMismatch {
                    expected: WireType::Delimited,
                    found: entry.wire_type(),
                });
            }
            list.push(read::bytes_at(cursor, entry.start())?);
        }
        field.cache_decoded(Value::BytesList(list.clone()));
        Ok(list)
    }

    /// Replace the repeated bytes field
    pub fn set_repeated_bytes(&mut self, field_number: u32, values: Vec<Bytes>) -> Result<()> {
        check_field_number(field_number)?;
        let fields = self.fields_mut()?;
        store_cached(
            fields,
            field_number,
            Value::BytesList(values),
            encode_repeated_bytes,
        );
        Ok(())
    }

    /// Append one bytes element
    pub fn add_bytes(&mut self, field_number: u32, value: impl Into<Bytes>) -> Result<()> {
        let mut list = self.repeated_bytes(field_number)?;
        list.push(value.into());
        self.set_repeated_bytes(field_number, list)
    }

    // -- message and group fields -------------------------------------------

    /// Read-only view of a sub-message field
    ///
    /// Repeated calls return the same cached kernel. When absent, a fresh
    /// empty kernel is returned without being attached to this message, so
    /// mutating it has no effect on the parent's output. Because the view
    /// is read-only, the original bytes stay authoritative: mutations of the
    /// returned handle are not serialized.
    pub fn message(&mut self, field_number: u32) -> Result<MessageHandle> {
        self.child_read_only(field_number, WireType::Delimited)
    }

    /// Read-only view of a group field, same contract as [`Kernel::message`]
    pub fn group(&mut self, field_number: u32) -> Result<MessageHandle> {
        self.child_read_only(field_number, WireType::StartGroup)
    }

    /// Mutable sub-message handle, or `None` when the field is absent
    ///
    /// Materializing through this entry point installs a re-encoder, so
    /// later mutation of the handle is visible in the parent's serialize
    /// output. Requesting it for a slot already materialized through the
    /// read-only contract fails with [`Error::ReadOnlyAliased`].
    pub fn message_or_null(&mut self, field_number: u32) -> Result<Option<MessageHandle>> {
        self.child_mutable(field_number, WireType::Delimited, false)
    }

    /// Mutable group handle, or `None` when the field is absent
    pub fn group_or_null(&mut self, field_number: u32) -> Result<Option<MessageHandle>> {
        self.child_mutable(field_number, WireType::StartGroup, false)
    }

    /// Mutable sub-message handle, creating and attaching an empty one when
    /// the field is absent
    ///
    /// Attaching marks the field present even if left empty.
    pub fn message_attach(&mut self, field_number: u32) -> Result<MessageHandle> {
        match self.child_mutable(field_number, WireType::Delimited, true)? {
            Some(handle) => Ok(handle),
            None => Err(Error::DecodeInvariant),
        }
    }

    /// Mutable group handle, creating and attaching an empty one when absent
    pub fn group_attach(&mut self, field_number: u32) -> Result<MessageHandle> {
        match self.child_mutable(field_number, WireType::StartGroup, true)? {
            Some(handle) => Ok(handle),
            None => Err(Error::DecodeInvariant),
        }
    }

    /// Write a sub-message field, replacing any prior occurrences
    pub fn set_message(&mut self, field_number: u32, handle: MessageHandle) -> Result<()> {
        check_field_number(field_number)?;
        let fields = self.fields_mut()?;
        store_cached(fields, field_number, Value::Message(handle), encode_message);
        Ok(())
    }

    /// Write a group field, replacing any prior occurrences
    pub fn set_group(&mut self, field_number: u32, handle: MessageHandle) -> Result<()> {
        check_field_number(field_number)?;
        let fields = self.fields_mut()?;
        store_cached(fields, field_number, Value::Message(handle), encode_group);
        Ok(())
    }

    /// Read all elements of a repeated sub-message field
    ///
    /// Each wire occurrence decodes as its own kernel; occurrences are not
    /// merged, unlike the singular accessors.
    pub fn repeated_message(&mut self, field_number: u32) -> Result<Vec<MessageHandle>> {
        self.repeated_children(field_number, WireType::Delimited)
    }

    /// Read all elements of a repeated group field
    pub fn repeated_group(&mut self, field_number: u32) -> Result<Vec<MessageHandle>> {
        self.repeated_children(field_number, WireType::StartGroup)
    }

    /// Replace a repeated sub-message field
    pub fn set_repeated_message(
        &mut self,
        field_number: u32,
        handles: Vec<MessageHandle>,
    ) -> Result<()> {
        check_field_number(field_number)?;
        let fields = self.fields_mut()?;
        store_cached(
            fields,
            field_number,
            Value::MessageList(handles),
            encode_repeated_message,
        );
        Ok(())
    }

    /// Replace a repeated group field
    pub fn set_repeated_group(
        &mut self,
        field_number: u32,
        handles: Vec<MessageHandle>,
    ) -> Result<()> {
        check_field_number(field_number)?;
        let fields = self.fields_mut()?;
        store_cached(
            fields,
            field_number,
            Value::MessageList(handles),
            encode_repeated_group,
        );
        Ok(())
    }

    /// Append one sub-message element
    pub fn add_message(&mut self, field_number: u32, handle: MessageHandle) -> Result<()> {
        let mut list = self.repeated_message(field_number)?;
        list.push(handle);
        self.set_repeated_message(field_number, list)
    }

    /// Append one group element
    pub fn add_group(&mut self, field_number: u32, handle: MessageHandle) -> Result<()> {
        let mut list = self.repeated_group(field_number)?;
        list.push(handle);
        self.set_repeated_group(field_number, list)
    }

    fn child_read_only(&mut self, field_number: u32, wire: WireType) -> Result<MessageHandle> {
        check_field_number(field_number)?;
        let pivot = self.pivot;
        let buffer = self.buffer.clone();
        let fields = self.fields_mut()?;
        let field = match fields.get_mut(field_number) {
            Some(field) => field,
            None => return Ok(new_handle(Kernel::empty_with_pivot(pivot))),
        };
        if let Some(value) = field.decoded_value() {
            return match value {
                Value::Message(handle) => Ok(handle.clone()),
                _ => Err(Error::TypeMismatch),
            };
        }
        let cursor = buffer.as_ref().ok_or(Error::DecodeInvariant)?;
        let entries = field.index_entries().ok_or(Error::DecodeInvariant)?;
        let region = match wire {
            WireType::StartGroup => merged_group(cursor, entries, field_number)?,
            _ => merged_delimited(cursor, entries)?,
        };
        let handle = new_handle(Kernel::from_cursor(region, pivot));
        field.cache_decoded(Value::Message(handle.clone()));
        Ok(handle)
    }

    fn child_mutable(
        &mut self,
        field_number: u32,
        wire: WireType,
        attach: bool,
    ) -> Result<Option<MessageHandle>> {
        check_field_number(field_number)?;
        let pivot = self.pivot;
        let buffer = self.buffer.clone();
        let encoder: FieldEncoder = match wire {
            WireType::StartGroup => encode_group,
            _ => encode_message,
        };
        let fields = self.fields_mut()?;
        if fields.get(field_number).is_none() {
            if !attach {
                return Ok(None);
            }
            let handle = new_handle(Kernel::empty_with_pivot(pivot));
            store_cached(fields, field_number, Value::Message(handle.clone()), encoder);
            return Ok(Some(handle));
        }
        let field = match fields.get_mut(field_number) {
            Some(field) => field,
            None => return Err(Error::DecodeInvariant),
        };
        match field {
            Field::Cached { value, .. } => match value {
                Value::Message(handle) => Ok(Some(handle.clone())),
                _ => Err(Error::TypeMismatch),
            },
            Field::CachedWithRaw { value, .. } => match value {
                // Materialized through the read-only contract; handing out a
                // mutable alias now would silently fork parent and child.
                Value::Message(_) => Err(Error::ReadOnlyAliased(field_number)),
                _ => Err(Error::TypeMismatch),
            },
            Field::Raw(_) => {
                let cursor = buffer.as_ref().ok_or(Error::DecodeInvariant)?;
                let entries = field.index_entries().ok_or(Error::DecodeInvariant)?;
                let region = match wire {
                    WireType::StartGroup => merged_group(cursor, entries, field_number)?,
                    _ => merged_delimited(cursor, entries)?,
                };
                let handle = new_handle(Kernel::from_cursor(region, pivot));
                field.cache_with_encoder(Value::Message(handle.clone()), encoder);
                Ok(Some(handle))
            }
        }
    }

    fn repeated_children(&mut self, field_number: u32, wire: WireType) -> Result<Vec<MessageHandle>> {
        check_field_number(field_number)?;
        let pivot = self.pivot;
        let buffer = self.buffer.clone();
        let fields = self.fields_mut()?;
        let field = match fields.get_mut(field_number) {
            Some(field) => field,
            None => return Ok(Vec::new()),
        };
        if let Some(value) = field.decoded_value() {
            return match value {
                Value::MessageList(list) => Ok(list.clone()),
                _ => Err(Error::TypeMismatch),
            };
        }
        let cursor = buffer.as_ref().ok_or(Error::DecodeInvariant)?;
        let entries = field.index_entries().ok_or(Error::DecodeInvariant)?;
        let mut list = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.wire_type() != wire {
                return Err(Error::WireTypeMismatch {
                    expected: wire,
                    found: entry.wire_type(),
                });
            }
            let region = match wire {
                WireType::StartGroup => read::group_at(cursor, entry.start(), field_number)?,
                _ => read::delimited_at(cursor, entry.start())?,
            };
            list.push(new_handle(Kernel::from_cursor(region, pivot)));
        }
        field.cache_decoded(Value::MessageList(list.clone()));
        Ok(list)
    }
}

scalar_accessors!(get_bool, set_bool, encode_bool_field, bool, Bool, WireType::Varint, read::bool_at, write_bool, "bool");
scalar_accessors!(get_int32, set_int32, encode_int32_field, i32, Int32, WireType::Varint, read::int32_at, write_int32, "int32");
scalar_accessors!(get_int64, set_int64, encode_int64_field, i64, Int64, WireType::Varint, read::int64_at, write_int64, "int64");
scalar_accessors!(get_uint32, set_uint32, encode_uint32_field, u32, Uint32, WireType::Varint, read::uint32_at, write_uint32, "uint32");
scalar_accessors!(get_uint64, set_uint64, encode_uint64_field, u64, Uint64, WireType::Varint, read::uint64_at, write_uint64, "uint64");
scalar_accessors!(get_sint32, set_sint32, encode_sint32_field, i32, Int32, WireType::Varint, read::sint32_at, write_sint32, "sint32");
scalar_accessors!(get_sint64, set_sint64, encode_sint64_field, i64, Int64, WireType::Varint, read::sint64_at, write_sint64, "sint64");
scalar_accessors!(get_fixed32, set_fixed32, encode_fixed32_field, u32, Uint32, WireType::Fixed32, read::fixed32_at, write_fixed32, "fixed32");
scalar_accessors!(get_sfixed32, set_sfixed32, encode_sfixed32_field, i32, Int32, WireType::Fixed32, read::sfixed32_at, write_sfixed32, "sfixed32");
scalar_accessors!(get_fixed64, set_fixed64, encode_fixed64_field, u64, Uint64, WireType::Fixed64, read::fixed64_at, write_fixed64, "fixed64");
scalar_accessors!(get_sfixed64, set_sfixed64, encode_sfixed64_field, i64, Int64, WireType::Fixed64, read::sfixed64_at, write_sfixed64, "sfixed64");
scalar_accessors!(get_float, set_float, encode_float_field, f32, Float, WireType::Fixed32, read::float_at, write_float, "float");
scalar_accessors!(get_double, set_double, encode_double_field, f64, Double, WireType::Fixed64, read::double_at, write_double, "double");

repeated_scalar_accessors!(repeated_bool, set_packed_bool, set_unpacked_bool, add_packed_bool, add_unpacked_bool, encode_packed_bool_field, encode_unpacked_bool_field, bool, BoolList, WireType::Varint, read::bool_at, read::packed_bool_at, write_bool, write_packed_bool, "bool");
repeated_scalar_accessors!(repeated_int32, set_packed_int32, set_unpacked_int32, add_packed_int32, add_unpacked_int32, encode_packed_int32_field, encode_unpacked_int32_field, i32, Int32List, WireType::Varint, read::int32_at, read::packed_int32_at, write_int32, write_packed_int32, "int32");
repeated_scalar_accessors!(repeated_int64, set_packed_int64, set_unpacked_int64, add_packed_int64, add_unpacked_int64, encode_packed_int64_field, encode_unpacked_int64_field, i64, Int64List, WireType::Varint, read::int64_at, read::packed_int64_at, write_int64, write_packed_int64, "int64");
repeated_scalar_accessors!(repeated_uint32, set_packed_uint32, set_unpacked_uint32, add_packed_uint32, add_unpacked_uint32, encode_packed_uint32_field, encode_unpacked_uint32_field, u32, Uint32List, WireType::Varint, read::uint32_at, read::packed_uint32_at, write_uint32, write_packed_uint32, "uint32");
repeated_scalar_accessors!(repeated_uint64, set_packed_uint64, set_unpacked_uint64, add_packed_uint64, add_unpacked_uint64, encode_packed_uint64_field, encode_unpacked_uint64_field, u64, Uint64List, WireType::Varint, read::uint64_at, read::packed_uint64_at, write_uint64, write_packed_uint64, "uint64");
repeated_scalar_accessors!(repeated_sint32, set_packed_sint32, set_unpacked_sint32, add_packed_sint32, add_unpacked_sint32, encode_packed_sint32_field, encode_unpacked_sint32_field, i32, Int32List, WireType::Varint, read::sint32_at, read::packed_sint32_at, write_sint32, write_packed_sint32, "sint32");
repeated_scalar_accessors!(repeated_sint64, set_packed_sint64, set_unpacked_sint64, add_packed_sint64, add_unpacked_sint64, encode_packed_sint64_field, encode_unpacked_sint64_field, i64, Int64List, WireType::Varint, read::sint64_at, read::packed_sint64_at, write_sint64, write_packed_sint64, "sint64");
repeated_scalar_accessors!(repeated_fixed32, set_packed_fixed32, set_unpacked_fixed32, add_packed_fixed32, add_unpacked_fixed32, encode_packed_fixed32_field, encode_unpacked_fixed32_field, u32, Uint32List, WireType::Fixed32, read::fixed32_at, read::packed_fixed32_at, write_fixed32, write_packed_fixed32, "fixed32");
repeated_scalar_accessors!(repeated_sfixed32, set_packed_sfixed32, set_unpacked_sfixed32, add_packed_sfixed32, add_unpacked_sfixed32, encode_packed_sfixed32_field, encode_unpacked_sfixed32_field, i32, Int32List, WireType::Fixed32, read::sfixed32_at, read::packed_sfixed32_at, write_sfixed32, write_packed_sfixed32, "sfixed32");
repeated_scalar_accessors!(repeated_fixed64, set_packed_fixed64, set_unpacked_fixed64, add_packed_fixed64, add_unpacked_fixed64, encode_packed_fixed64_field, encode_unpacked_fixed64_field, u64, Uint64List, WireType::Fixed64, read::fixed64_at, read::packed_fixed64_at, write_fixed64, write_packed_fixed64, "fixed64");
repeated_scalar_accessors!(repeated_sfixed64, set_packed_sfixed64, set_unpacked_sfixed64, add_packed_sfixed64, add_unpacked_sfixed64, encode_packed_sfixed64_field, encode_unpacked_sfixed64_field, i64, Int64List, WireType::Fixed64, read::sfixed64_at, read::packed_sfixed64_at, write_sfixed64, write_packed_sfixed64, "sfixed64");
repeated_scalar_accessors!(repeated_float, set_packed_float, set_unpacked_float, add_packed_float, add_unpacked_float, encode_packed_float_field, encode_unpacked_float_field, f32, FloatList, WireType::Fixed32, read::float_at, read::packed_float_at, write_float, write_packed_float, "float");
repeated_scalar_accessors!(repeated_double, set_packed_double, set_unpacked_double, add_packed_double, add_unpacked_double, encode_packed_double_field, encode_unpacked_double_field, f64, DoubleList, WireType::Fixed64, read::double_at, read::packed_double_at, write_double, write_packed_double, "double");

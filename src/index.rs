//! Single-pass field indexer
//!
//! One forward scan over the buffer records, per field number, where each
//! occurrence's payload starts and what wire type it carries. Nothing is
//! decoded; decoding happens later, per field, on first access.

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::field::{Field, IndexEntry, Storage};
use crate::tag::{read_tag, skip_field, WireType};

/// Scan the buffer and build per-field raw entry lists
///
/// Entries for a repeated field keep wire order. Group occurrences record
/// the content start (just past the start marker); the matching end marker
/// is re-located during decode or raw copy. A top-level end-group marker
/// means the buffer is not a well-formed message.
pub fn build_index(cursor: &ByteCursor, pivot: u32) -> Result<Storage> {
    let mut storage = Storage::with_pivot(pivot);
    let mut scan = cursor.clone();
    scan.set_cursor(0);

    while scan.has_remaining() {
        let (field_number, wire_type) = read_tag(&mut scan)?;
        if wire_type == WireType::EndGroup {
            return Err(Error::UnexpectedEndGroup);
        }
        let entry = IndexEntry::new(wire_type, scan.cursor());
        match storage.get_mut(field_number) {
            Some(field) => field.add_index_entry(entry)?,
            None => storage.set(field_number, Field::from_first_index_entry(entry)),
        }
        skip_field(&mut scan, wire_type, field_number)?;
    }
    Ok(storage)
}

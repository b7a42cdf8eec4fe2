//! Legacy extension-group compatibility format
//!
//! A message-set is a repeated group at field 1 where each group instance
//! carries a `type_id` (uint32, field 2) and a `message` payload (bytes,
//! field 3). This module exposes the typeId → payload view on top of a
//! [`Kernel`]. Duplicate type ids collapse to the last occurrence during
//! construction; when that happens the underlying field is rewritten so
//! that re-serialization is idempotent.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::vec::Vec;
use bytes::Bytes;
use core::cell::RefCell;

use crate::error::Result;
use crate::field::MessageHandle;
use crate::kernel::Kernel;

const ENTRY_FIELD: u32 = 1;
const TYPE_ID_FIELD: u32 = 2;
const PAYLOAD_FIELD: u32 = 3;

/// typeId → message view over the legacy extension-group encoding
#[derive(Debug)]
pub struct MessageSet {
    kernel: Kernel,
    entries: Vec<MessageHandle>,
    index: BTreeMap<u32, usize>,
}

impl MessageSet {
    /// Parse a message-set from encoded bytes
    ///
    /// Collapses duplicate type ids to their last occurrence, keeping the
    /// first occurrence's position. A set without duplicates keeps its
    /// original bytes authoritative.
    pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self> {
        let mut kernel = Kernel::from_bytes(data);
        let raw_entries = kernel.repeated_group(ENTRY_FIELD)?;

        let mut entries: Vec<MessageHandle> = Vec::with_capacity(raw_entries.len());
        let mut index = BTreeMap::new();
        let mut collapsed = false;
        for handle in raw_entries {
            let type_id = handle.borrow_mut().get_uint32(TYPE_ID_FIELD, 0)?;
            match index.get(&type_id) {
                Some(&pos) => {
                    entries[pos] = handle;
                    collapsed = true;
                }
                None => {
                    index.insert(type_id, entries.len());
                    entries.push(handle);
                }
            }
        }
        if collapsed {
            kernel.set_repeated_group(ENTRY_FIELD, entries.clone())?;
        }
        Ok(MessageSet {
            kernel,
            entries,
            index,
        })
    }

    /// Create an empty message-set
    pub fn empty() -> Self {
        MessageSet {
            kernel: Kernel::empty(),
            entries: Vec::new(),
            index: BTreeMap::new(),
        }
    }

    /// True when a payload is stored under the given type id
    pub fn has_message(&self, type_id: u32) -> bool {
        self.index.contains_key(&type_id)
    }

    /// Payload bytes stored under the given type id
    pub fn message(&mut self, type_id: u32) -> Result<Option<Bytes>> {
        let pos = match self.index.get(&type_id) {
            Some(&pos) => pos,
            None => return Ok(None),
        };
        let payload = self.entries[pos]
            .borrow_mut()
            .get_bytes(PAYLOAD_FIELD, Bytes::new())?;
        Ok(Some(payload))
    }

    /// Store a payload under the given type id, replacing any existing one
    pub fn set_message(&mut self, type_id: u32, payload: impl Into<Bytes>) -> Result<()> {
        match self.index.get(&type_id) {
            Some(&pos) => {
                self.entries[pos]
                    .borrow_mut()
                    .set_bytes(PAYLOAD_FIELD, payload)?;
            }
            None => {
                let mut entry = Kernel::empty();
                entry.set_uint32(TYPE_ID_FIELD, type_id)?;
                entry.set_bytes(PAYLOAD_FIELD, payload)?;
                self.index.insert(type_id, self.entries.len());
                self.entries.push(Rc::new(RefCell::new(entry)));
            }
        }
        // Mutations route through entry handles obtained by a read, so the
        // repeated field must be re-attached with an encoder to serialize.
        self.kernel
            .set_repeated_group(ENTRY_FIELD, self.entries.clone())
    }

    /// All stored type ids in ascending order
    pub fn type_ids(&self) -> Vec<u32> {
        self.index.keys().copied().collect()
    }

    /// Serialize the set back to the legacy wire encoding
    pub fn serialize(&self) -> Result<Bytes> {
        self.kernel.serialize()
    }
}

//! Per-field slot state and the pivot-partitioned field container
//!
//! A [`Field`] tracks one field number's state: raw byte locations from the
//! index, a decoded cache, or both. The raw locations are dropped only when
//! a re-encoder accompanies the cached value; that rule is enforced by the
//! variant constructors, not by a runtime flag.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use bytes::Bytes;
use core::cell::RefCell;

use crate::error::{Error, Result};
use crate::kernel::Kernel;
use crate::tag::WireType;
use crate::write::Writer;

/// Default pivot: field numbers up to this live in the dense array.
///
/// Covers roughly 85% of field numbers seen in real schemas.
pub const DEFAULT_PIVOT: u32 = 24;

/// Shared handle to a decoded sub-message or group kernel
pub type MessageHandle = Rc<RefCell<Kernel>>;

/// Re-encoder invoked during serialization for a cached value
pub type FieldEncoder = fn(&mut Writer, u32, &Value) -> Result<()>;

/// Compact (wire type, byte offset) pair, packed into a single integer
///
/// The offset points at the payload start, just past the field's tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry(u64);

impl IndexEntry {
    /// Pack a wire type and payload offset
    #[inline]
    pub fn new(wire_type: WireType, offset: usize) -> Self {
        Self(((offset as u64) << 3) | wire_type as u64)
    }

    /// Wire type of the indexed occurrence
    #[inline]
    pub fn wire_type(&self) -> WireType {
        // Only valid wire types are ever packed in.
        match self.0 & 0x07 {
            0 => WireType::Varint,
            1 => WireType::Fixed64,
            2 => WireType::Delimited,
            3 => WireType::StartGroup,
            4 => WireType::EndGroup,
            _ => WireType::Fixed32,
        }
    }

    /// Payload start offset within the kernel's buffer region
    #[inline]
    pub fn start(&self) -> usize {
        (self.0 >> 3) as usize
    }
}

/// Decoded field value cached in a slot
#[derive(Debug, Clone)]
pub enum Value {
    /// Singular bool
    Bool(bool),
    /// Singular int32/sint32/sfixed32/enum
    Int32(i32),
    /// Singular int64/sint64/sfixed64
    Int64(i64),
    /// Singular uint32/fixed32
    Uint32(u32),
    /// Singular uint64/fixed64
    Uint64(u64),
    /// Singular float
    Float(f32),
    /// Singular double
    Double(f64),
    /// Singular string
    Str(String),
    /// Singular bytes
    Bytes(Bytes),
    /// Singular sub-message or group kernel
    Message(MessageHandle),
    /// Repeated bool
    BoolList(Vec<bool>),
    /// Repeated 32-bit signed values
    Int32List(Vec<i32>),
    /// Repeated 64-bit signed values
    Int64List(Vec<i64>),
    /// Repeated 32-bit unsigned values
    Uint32List(Vec<u32>),
    /// Repeated 64-bit unsigned values
    Uint64List(Vec<u64>),
    /// Repeated float
    FloatList(Vec<f32>),
    /// Repeated double
    DoubleList(Vec<f64>),
    /// Repeated string
    StrList(Vec<String>),
    /// Repeated bytes
    BytesList(Vec<Bytes>),
    /// Repeated sub-message or group kernels
    MessageList(Vec<MessageHandle>),
}

impl Value {
    /// True for a list variant with no elements
    ///
    /// Presence of a repeated field is decided by element count: an
    /// explicitly empty repeated field reads as absent.
    pub fn is_empty_list(&self) -> bool {
        match self {
            Value::BoolList(v) => v.is_empty(),
            Value::Int32List(v) => v.is_empty(),
            Value::Int64List(v) => v.is_empty(),
            Value::Uint32List(v) => v.is_empty(),
            Value::Uint64List(v) => v.is_empty(),
            Value::FloatList(v) => v.is_empty(),
            Value::DoubleList(v) => v.is_empty(),
            Value::StrList(v) => v.is_empty(),
            Value::BytesList(v) => v.is_empty(),
            Value::MessageList(v) => v.is_empty(),
            _ => false,
        }
    }
}

/// Tagged per-field state
///
/// Invariant: a slot always holds raw entries, a cached value, or both.
/// `Cached` is the only variant without raw entries and the only one
/// carrying an encoder, so dropping the original bytes is impossible
/// without a way to re-emit the field.
#[derive(Debug, Clone)]
pub enum Field {
    /// Raw byte locations in wire order, no decode performed yet
    Raw(Vec<IndexEntry>),
    /// Decoded value plus the encoder that re-emits it
    Cached {
        /// Decoded value
        value: Value,
        /// Serialization function for the value
        encoder: FieldEncoder,
    },
    /// Decoded value without an encoder; original entries are retained as
    /// the only way to re-emit the field's bytes
    CachedWithRaw {
        /// Decoded value
        value: Value,
        /// Original raw locations, still authoritative for serialization
        entries: Vec<IndexEntry>,
    },
}

impl Field {
    /// Create a slot from the first indexed occurrence
    #[inline]
    pub fn from_first_index_entry(entry: IndexEntry) -> Self {
        Field::Raw(vec![entry])
    }

    /// Append another indexed occurrence, preserving wire order
    ///
    /// Only legal while the slot is still raw; the indexer runs before any
    /// decode can happen.
    #[inline]
    pub fn add_index_entry(&mut self, entry: IndexEntry) -> Result<()> {
        match self {
            Field::Raw(entries) => {
                entries.push(entry);
                Ok(())
            }
            _ => Err(Error::DecodeInvariant),
        }
    }

    /// Cache a decoded value together with its re-encoder, dropping raw entries
    #[inline]
    pub fn cache_with_encoder(&mut self, value: Value, encoder: FieldEncoder) {
        *self = Field::Cached { value, encoder };
    }

    /// Cache a decoded value while keeping raw entries authoritative
    ///
    /// Used by read-triggered decodes: the original bytes keep being
    /// byte-copied on serialization, so reads never perturb output.
    #[inline]
    pub fn cache_decoded(&mut self, value: Value) {
        let entries = match self {
            Field::Raw(entries) => core::mem::take(entries),
            Field::CachedWithRaw { entries, .. } => core::mem::take(entries),
            Field::Cached { .. } => Vec::new(),
        };
        if entries.is_empty() {
            if let Field::Cached { encoder, .. } = self {
                // Already encoder-backed; only refresh the value.
                *self = Field::Cached {
                    value,
                    encoder: *encoder,
                };
                return;
            }
        }
        *self = Field::CachedWithRaw { value, entries };
    }

    /// Cached value, if any decode or write has happened
    #[inline]
    pub fn decoded_value(&self) -> Option<&Value> {
        match self {
            Field::Raw(_) => None,
            Field::Cached { value, .. } | Field::CachedWithRaw { value, .. } => Some(value),
        }
    }

    /// Encoder, present only for written (or mutably materialized) slots
    #[inline]
    pub fn encoder(&self) -> Option<FieldEncoder> {
        match self {
            Field::Cached { encoder, .. } => Some(*encoder),
            _ => None,
        }
    }

    /// Raw index entries, if the original bytes are still authoritative
    #[inline]
    pub fn index_entries(&self) -> Option<&[IndexEntry]> {
        match self {
            Field::Raw(entries) | Field::CachedWithRaw { entries, .. } => Some(entries),
            Field::Cached { .. } => None,
        }
    }
}

/// Field-number → slot container, pivot-partitioned
///
/// Numbers `1..=pivot` live in a dense array indexed by `number - 1`;
/// larger numbers go to a lazily created ordered map.
#[derive(Debug, Clone)]
pub struct Storage {
    pivot: u32,
    array: Vec<Option<Field>>,
    map: Option<BTreeMap<u32, Field>>,
}

impl Default for Storage {
    fn default() -> Self {
        Self::with_pivot(DEFAULT_PIVOT)
    }
}

impl Storage {
    /// Create storage with the default pivot
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage with the given pivot
    pub fn with_pivot(pivot: u32) -> Self {
        Storage {
            pivot,
            array: vec![None; pivot as usize],
            map: None,
        }
    }

    /// The array/map partition threshold
    #[inline]
    pub fn pivot(&self) -> u32 {
        self.pivot
    }

    /// Slot for the given field number
    #[inline]
    pub fn get(&self, field_number: u32) -> Option<&Field> {
        if field_number <= self.pivot {
            self.array[(field_number - 1) as usize].as_ref()
        } else {
            self.map.as_ref()?.get(&field_number)
        }
    }

    /// Mutable slot for the given field number
    #[inline]
    pub fn get_mut(&mut self, field_number: u32) -> Option<&mut Field> {
        if field_number <= self.pivot {
            self.array[(field_number - 1) as usize].as_mut()
        } else {
            self.map.as_mut()?.get_mut(&field_number)
        }
    }

    /// Store a slot for the given field number, replacing any previous one
    pub fn set(&mut self, field_number: u32, field: Field) {
        if field_number <= self.pivot {
            self.array[(field_number - 1) as usize] = Some(field);
        } else {
            self.map
                .get_or_insert_with(BTreeMap::new)
                .insert(field_number, field);
        }
    }

    /// Remove the slot for the given field number
    pub fn remove(&mut self, field_number: u32) {
        if field_number <= self.pivot {
            self.array[(field_number - 1) as usize] = None;
        } else if let Some(map) = self.map.as_mut() {
            map.remove(&field_number);
        }
    }

    /// Iterate slots: array region ascending, then map region ascending
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Field)> {
        let dense = self
            .array
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|f| (i as u32 + 1, f)));
        let sparse = self
            .map
            .iter()
            .flat_map(|m| m.iter().map(|(n, f)| (*n, f)));
        dense.chain(sparse)
    }

    /// Slot-level copy; index entries and cached handles are shared,
    /// list caches are duplicated
    #[inline]
    pub fn shallow_copy(&self) -> Storage {
        self.clone()
    }
}

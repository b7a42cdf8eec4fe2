//! LazyWire: lazy codec for the protocol-buffer wire format
//!
//! This crate parses an encoded byte buffer into a structure addressable by
//! field number without eagerly decoding payloads, decodes individual fields
//! on demand, caches decoded values, and re-serializes a message reproducing
//! untouched bytes exactly while freshly encoding written fields.
//!
//! # Wire Format
//!
//! ```text
//! +-----------------------------+------------------------------+
//! | tag varint                  | payload                      |
//! | (field_number << 3 | type)  | per wire type:               |
//! +-----------------------------+------------------------------+
//! | VARINT=0      base-128 varint, up to 10 bytes              |
//! | FIXED64=1     8 bytes little-endian                        |
//! | DELIMITED=2   length varint + that many bytes              |
//! | START_GROUP=3 nested fields until matching END_GROUP=4     |
//! | FIXED32=5     4 bytes little-endian                        |
//! +------------------------------------------------------------+
//! ```
//!
//! # Features
//!
//! - Deferred indexing: nothing is scanned until the first field access
//! - Per-field lazy decode with caching; reads never change output bytes
//! - Byte-exact re-serialization of untouched fields, including
//!   non-canonical varint encodings
//! - Full scalar, string, bytes, message and legacy group accessors,
//!   packed and unpacked repeated fields
//! - Pivot-tuned hybrid array/map field storage
//! - O(fields) shallow copy with copy-on-write slot semantics
//! - `no_std` support with `alloc`
//!
//! # Example
//!
//! ```rust
//! use lazywire::Kernel;
//!
//! // field 1 = varint 1, field 2 = "hi"
//! let mut kernel = Kernel::from_bytes(&[0x08, 0x01, 0x12, 0x02, b'h', b'i'][..]);
//!
//! assert_eq!(kernel.get_int32(1, 0)?, 1);
//! assert_eq!(kernel.get_string(2, "")?, "hi");
//!
//! // Untouched fields round-trip byte-for-byte; written fields re-encode.
//! kernel.set_int32(1, 5)?;
//! assert_eq!(
//!     kernel.serialize()?.as_ref(),
//!     &[0x08, 0x05, 0x12, 0x02, b'h', b'i']
//! );
//! # Ok::<(), lazywire::Error>(())
//! ```
//!
//! Enum fields share the int32 accessors; their wire shape is identical.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod cursor;
pub mod error;
pub mod field;
pub mod index;
pub mod kernel;
pub mod message_set;
pub mod read;
pub mod tag;
pub mod utf8;
pub mod varint;
pub mod write;

// Re-export main types
pub use cursor::ByteCursor;
pub use error::{Error, Result};
pub use field::{MessageHandle, Value, DEFAULT_PIVOT};
pub use kernel::Kernel;
pub use message_set::MessageSet;
pub use tag::WireType;
pub use write::Writer;

/// Largest encodable field number (2^29 - 1)
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

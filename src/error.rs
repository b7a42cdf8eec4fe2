//! Error types for the lazywire kernel
//!
//! Three broad categories: bounds errors (index/length/field-number range),
//! state errors (malformed wire data), and type errors (wrong-typed access
//! to a cached value or a violated aliasing contract).

use core::fmt;

use crate::tag::WireType;

/// Errors that can occur during indexing, decoding or serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Read past the end of the buffer region
    UnexpectedEof,
    /// Varint continued past its 10-byte maximum
    InvalidVarint,
    /// Tag carried wire type 6 or 7
    InvalidWireType(u8),
    /// Field number outside `1..=MAX_FIELD_NUMBER`
    InvalidFieldNumber(u32),
    /// Wire type in the index does not match the accessed field kind
    WireTypeMismatch {
        /// Wire type the accessor requires
        expected: WireType,
        /// Wire type found in the index entry
        found: WireType,
    },
    /// Group payload ran out of input before its end marker
    MissingEndGroup,
    /// END_GROUP marker for a different field number appeared first
    UnmatchedEndGroup {
        /// Field number of the open group
        expected: u32,
        /// Field number carried by the stray end marker
        found: u32,
    },
    /// END_GROUP marker with no open group
    UnexpectedEndGroup,
    /// Packed payload length not a whole number of elements
    PackedLengthMismatch,
    /// Delimited field is not valid UTF-8
    InvalidUtf8,
    /// Cached value accessed through an accessor of a different type
    TypeMismatch,
    /// Mutable sub-message access after the slot was materialized through
    /// the read-only contract
    ReadOnlyAliased(u32),
    /// Decode invariant violated (internal consistency error)
    DecodeInvariant,
}

impl Error {
    /// Returns a human-readable description of the error
    pub const fn description(&self) -> &'static str {
        match self {
            Error::UnexpectedEof => "unexpected end of buffer",
            Error::InvalidVarint => "varint exceeds 10 bytes",
            Error::InvalidWireType(_) => "invalid wire type",
            Error::InvalidFieldNumber(_) => "field number out of range",
            Error::WireTypeMismatch { .. } => "wire type mismatch",
            Error::MissingEndGroup => "no end group found",
            Error::UnmatchedEndGroup { .. } => "expected stop group for open field",
            Error::UnexpectedEndGroup => "unexpected end group marker",
            Error::PackedLengthMismatch => "packed payload length mismatch",
            Error::InvalidUtf8 => "invalid UTF-8 in string field",
            Error::TypeMismatch => "cached value has a different type",
            Error::ReadOnlyAliased(_) => "slot already handed out read-only",
            Error::DecodeInvariant => "decode invariant violated",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidWireType(raw) => write!(f, "invalid wire type: {raw}"),
            Error::InvalidFieldNumber(n) => write!(f, "field number out of range: {n}"),
            Error::WireTypeMismatch { expected, found } => {
                write!(f, "expected wire type {expected:?} but found {found:?}")
            }
            Error::UnmatchedEndGroup { expected, found } => {
                write!(f, "expected stop group for field {expected}, found {found}")
            }
            Error::ReadOnlyAliased(n) => {
                write!(
                    f,
                    "field {n} was already materialized through the read-only contract"
                )
            }
            other => write!(f, "{}", other.description()),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias for lazywire operations
pub type Result<T> = core::result::Result<T, Error>;

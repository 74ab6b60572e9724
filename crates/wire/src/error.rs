//! Wire format errors

use qlink_core::AccessError;
use thiserror::Error;

/// Result alias for wire operations.
pub type Result<T> = std::result::Result<T, WireError>;

/// Failure to frame, encode or decode a kdb+ IPC message.
#[derive(Debug, Error)]
pub enum WireError {
    /// Socket or stream failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The message ended before the object did.
    #[error("unexpected end of message at offset {offset}")]
    Truncated {
        /// Byte offset where more input was needed
        offset: usize,
    },

    /// A tag this codec does not handle (enums, foreign objects, ...).
    #[error("unsupported type tag {0}")]
    UnsupportedType(i8),

    /// Header fields out of range.
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),

    /// Negative or oversized length.
    #[error("invalid length {0}")]
    InvalidLength(i64),

    /// Symbol or error text that is not UTF-8.
    #[error("invalid UTF-8 in symbol")]
    InvalidUtf8,

    /// Nesting past the decoder's depth limit.
    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),

    /// A structurally invalid object.
    #[error("malformed object: {0}")]
    Malformed(String),

    /// Corrupt compressed payload.
    #[error("compression: {0}")]
    Compression(&'static str),
}

impl From<AccessError> for WireError {
    fn from(e: AccessError) -> Self {
        WireError::Malformed(e.to_string())
    }
}

//! Error types for typed access to kdb+ values

use crate::types::{StructType, Type};
use thiserror::Error;

/// Result alias for accessor operations.
pub type Result<T> = std::result::Result<T, AccessError>;

/// Misuse of a typed accessor, reported instead of reinterpreting storage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The value holds no block (failed request or decode).
    #[error("value is empty")]
    Null,

    /// The value has a different structural category than requested.
    #[error("expected {expected}, found {actual}")]
    WrongStructure {
        /// Category the accessor requires
        expected: StructType,
        /// Category of the value
        actual: StructType,
    },

    /// The value has a different element type than requested.
    #[error("expected type {expected}, found {actual}")]
    TypeMismatch {
        /// Type the accessor requires
        expected: Type,
        /// Type of the value
        actual: Type,
    },

    /// Index past the end of a vector, list or table.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Number of available elements
        len: usize,
    },

    /// No table column carries the requested name.
    #[error("column `{0}` not found")]
    ColumnNotFound(String),

    /// Storage variant does not fit the tag it was paired with.
    #[error("storage does not fit tag {tag}")]
    StorageMismatch {
        /// Offending tag
        tag: i8,
    },

    /// A compound block does not have the expected shape.
    #[error("malformed {0}")]
    Malformed(&'static str),
}

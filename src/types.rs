//! Public types for the qlink API.
//!
//! This module re-exports types from the workspace crates under one path.

// ============================================================================
// Type tags
// ============================================================================

pub use qlink_core::{Attribute, StructType, Type};

// Compile-time element types
pub use qlink_core::{
    Boolean, Byte, Char, Date, Datetime, Float, Int, KdbType, Long, Minute, Month, Native, Real,
    Second, Short, Symbol, Time, Timespan, Timestamp,
};

// ============================================================================
// Values and views
// ============================================================================

pub use qlink_core::{Dictionary, KeyedTable, List, Table, Value, Vector};

// Blocks, for building values by hand
pub use qlink_core::{Block, BlockRef, Storage};

// ============================================================================
// Connection
// ============================================================================

pub use qlink_client::{ConnectOptions, ConnectionState, Connector};

// ============================================================================
// Errors
// ============================================================================

pub use qlink_client::ClientError;
pub use qlink_core::AccessError;
pub use qlink_wire::WireError;

//! Core types for qlink
//!
//! This crate models kdb+ objects natively:
//! - Type tags: runtime [`Type`], [`StructType`] and [`Attribute`]
//! - Blocks: tagged, reference-counted object nodes ([`Block`], [`BlockRef`])
//! - Values: the root handle returned by every query ([`Value`])
//! - Views: typed access to vectors, tables, dictionaries and lists
//! - Temporal: `chrono` conversions for date and time payloads
//!
//! Compile-time element types are zero-sized markers ([`Long`], [`Symbol`],
//! [`Timestamp`], ...) implementing [`KdbType`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block;
pub mod dict;
pub mod error;
pub mod list;
pub mod native;
pub mod table;
pub mod temporal;
pub mod types;
pub mod value;
pub mod vector;

// Re-export commonly used types
pub use block::{Block, BlockRef, Storage, GENERIC_NULL_TAG};
pub use dict::Dictionary;
pub use error::{AccessError, Result};
pub use list::List;
pub use native::{
    Boolean, Byte, Char, Date, Datetime, Float, Int, KdbType, Long, Minute, Month, Native, Real,
    Second, Short, Symbol, Time, Timespan, Timestamp,
};
pub use table::{KeyedTable, Table};
pub use types::{Attribute, StructType, Type, ERROR_TAG, SORTED_DICT_TAG};
pub use value::Value;
pub use vector::Vector;

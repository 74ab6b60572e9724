//! qlink: typed access to kdb+ from Rust
//!
//! ```no_run
//! use qlink::{ConnectOptions, Connector, Long};
//!
//! let mut conn = Connector::new();
//! conn.connect(ConnectOptions::new("localhost", 5000)).unwrap();
//!
//! let table = conn
//!     .sync("([]col1:1 2 3 4;col2:1.1 2.2 3.3 4.4)")
//!     .as_table()
//!     .unwrap();
//! let col1 = table.column::<Long>(0).unwrap();
//! assert_eq!(col1, vec![1, 2, 3, 4]);
//! ```
//!
//! The workspace is split into:
//! - `qlink-core`: type tags, blocks, values and views
//! - `qlink-wire`: the IPC wire format
//! - `qlink-client`: the blocking connector

#![warn(missing_docs)]

pub mod types;

pub use types::*;

/// Temporal conversions to and from `chrono` types.
pub use qlink_core::temporal;

/// IPC wire format.
pub use qlink_wire as wire;

//! Blocking kdb+ client for qlink
//!
//! [`Connector`] dials a kdb+ process, authenticates, and exchanges q
//! commands for decoded [`qlink_core::Value`]s. Options come from code or a
//! TOML file via [`ConnectOptions`].
//!
//! Log output goes through `tracing` under the `qlink::client` target; the
//! library never installs a subscriber.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod connector;
pub mod error;
pub mod options;

pub use connector::{ConnectionState, Connector};
pub use error::{ClientError, Result};
pub use options::ConnectOptions;

//! kdb+ IPC wire format for qlink
//!
//! - `header`: the eight-byte message header
//! - `handshake`: credentials and capability exchange
//! - `encode` / `decode`: object serialization
//! - `compress`: the IPC compression scheme
//! - `frame`: whole messages on a byte stream
//!
//! See <https://code.kx.com/q/kb/serialization/>.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compress;
pub mod decode;
pub mod encode;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod header;

pub use compress::{compress, decompress};
pub use decode::{decode, MAX_DEPTH};
pub use encode::{encode, encode_command, encode_message};
pub use error::{Result, WireError};
pub use frame::{decode_message, read_message, write_message, Frame, MAX_MESSAGE_LEN};
pub use handshake::{encode_credentials, parse_credentials, CAPABILITY};
pub use header::{Header, MessageType, HEADER_LEN};

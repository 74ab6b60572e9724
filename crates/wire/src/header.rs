//! Message header
//!
//! Every IPC message starts with eight bytes:
//!
//! | Offset | Meaning |
//! |--------|---------|
//! | 0 | byte order (1 = little endian, 0 = big endian) |
//! | 1 | message type (0 async, 1 sync, 2 response) |
//! | 2 | compressed flag |
//! | 3 | reserved |
//! | 4..8 | total length including the header, in the message's byte order |

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{Result, WireError};

/// Size of the header in bytes.
pub const HEADER_LEN: usize = 8;

/// Kind of message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Fire-and-forget; no response.
    Async = 0,
    /// Request expecting a response.
    Sync = 1,
    /// Response to a sync request.
    Response = 2,
}

impl MessageType {
    /// Decode the message type byte.
    pub fn from_byte(b: u8) -> Option<MessageType> {
        match b {
            0 => Some(MessageType::Async),
            1 => Some(MessageType::Sync),
            2 => Some(MessageType::Response),
            _ => None,
        }
    }
}

/// Parsed message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Payload byte order.
    pub little_endian: bool,
    /// Message kind.
    pub msg_type: MessageType,
    /// Whether the body is compressed.
    pub compressed: bool,
    /// Total message length including the header.
    pub length: u32,
}

impl Header {
    /// Little-endian, uncompressed header for a message of `length` bytes.
    pub fn new(msg_type: MessageType, length: u32) -> Header {
        Header {
            little_endian: true,
            msg_type,
            compressed: false,
            length,
        }
    }

    /// Parse and validate eight header bytes.
    pub fn parse(bytes: &[u8; HEADER_LEN]) -> Result<Header> {
        let little_endian = match bytes[0] {
            0 => false,
            1 => true,
            _ => return Err(WireError::InvalidHeader("unknown byte order")),
        };
        let msg_type = MessageType::from_byte(bytes[1])
            .ok_or(WireError::InvalidHeader("unknown message type"))?;
        let length = if little_endian {
            LittleEndian::read_u32(&bytes[4..])
        } else {
            BigEndian::read_u32(&bytes[4..])
        };
        if (length as usize) < HEADER_LEN {
            return Err(WireError::InvalidHeader("length shorter than header"));
        }
        Ok(Header {
            little_endian,
            msg_type,
            compressed: bytes[2] == 1,
            length,
        })
    }

    /// Serialize the header.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0] = u8::from(self.little_endian);
        out[1] = self.msg_type as u8;
        out[2] = u8::from(self.compressed);
        if self.little_endian {
            LittleEndian::write_u32(&mut out[4..], self.length);
        } else {
            BigEndian::write_u32(&mut out[4..], self.length);
        }
        out
    }

    /// Length of the body following the header.
    pub fn body_len(&self) -> usize {
        (self.length as usize).saturating_sub(HEADER_LEN)
    }
}

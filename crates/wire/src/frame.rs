//! Reading and writing whole messages on a byte stream

use std::io::{Read, Write};

use qlink_core::{Block, BlockRef};

use crate::compress::decompress;
use crate::decode::decode;
use crate::encode::encode_message;
use crate::error::{Result, WireError};
use crate::header::{Header, MessageType, HEADER_LEN};

/// Largest message accepted from a peer.
pub const MAX_MESSAGE_LEN: usize = i32::MAX as usize;

/// A received message with its body expanded.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Header as received.
    pub header: Header,
    /// Uncompressed body.
    pub body: Vec<u8>,
}

impl Frame {
    /// Decode the body into an object.
    pub fn decode(&self) -> Result<BlockRef> {
        decode(&self.body, self.header.little_endian)
    }
}

/// Read one message, decompressing it if needed.
pub fn read_message<R: Read>(reader: &mut R) -> Result<Frame> {
    let mut head = [0u8; HEADER_LEN];
    reader.read_exact(&mut head)?;
    let header = Header::parse(&head)?;
    if header.length as usize > MAX_MESSAGE_LEN {
        return Err(WireError::InvalidLength(i64::from(header.length)));
    }

    let mut body = vec![0u8; header.body_len()];
    reader.read_exact(&mut body)?;
    tracing::trace!(
        target: "qlink::wire",
        msg_type = ?header.msg_type,
        length = header.length,
        compressed = header.compressed,
        "message received"
    );

    if header.compressed {
        body = decompress(&body, header.little_endian)?;
    }
    Ok(Frame { header, body })
}

/// Decode a complete in-memory message.
pub fn decode_message(message: &[u8]) -> Result<(Header, BlockRef)> {
    let head: &[u8; HEADER_LEN] = message
        .get(..HEADER_LEN)
        .and_then(|h| h.try_into().ok())
        .ok_or(WireError::Truncated { offset: message.len() })?;
    let header = Header::parse(head)?;
    let body = message
        .get(HEADER_LEN..header.length as usize)
        .ok_or(WireError::Truncated { offset: message.len() })?;
    let block = if header.compressed {
        decode(&decompress(body, header.little_endian)?, header.little_endian)?
    } else {
        decode(body, header.little_endian)?
    };
    Ok((header, block))
}

/// Serialize `block` and write it as one message.
pub fn write_message<W: Write>(writer: &mut W, msg_type: MessageType, block: &Block) -> Result<()> {
    let message = encode_message(msg_type, block)?;
    writer.write_all(&message)?;
    writer.flush()?;
    tracing::trace!(target: "qlink::wire", ?msg_type, length = message.len(), "message sent");
    Ok(())
}

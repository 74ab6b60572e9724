//! Serialization of kdb+ objects
//!
//! Always writes little-endian payloads.

use byteorder::{LittleEndian, WriteBytesExt};
use qlink_core::{Attribute, Block, Storage, StructType, ERROR_TAG, SORTED_DICT_TAG};

use crate::error::{Result, WireError};
use crate::header::{Header, MessageType, HEADER_LEN};

/// Serialize `block` into a message body.
pub fn encode(block: &Block) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_object(&mut out, block)?;
    Ok(out)
}

/// Serialize `block` into a complete message with header.
pub fn encode_message(msg_type: MessageType, block: &Block) -> Result<Vec<u8>> {
    let mut out = vec![0u8; HEADER_LEN];
    write_object(&mut out, block)?;
    finish(out, msg_type)
}

/// Message carrying `command` as a char vector, the form q evaluates.
pub fn encode_command(msg_type: MessageType, command: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(HEADER_LEN + 6 + command.len());
    out.extend_from_slice(&[0u8; HEADER_LEN]);
    out.push(10);
    out.push(0);
    write_len(&mut out, command.len())?;
    out.extend_from_slice(command.as_bytes());
    finish(out, msg_type)
}

fn finish(mut out: Vec<u8>, msg_type: MessageType) -> Result<Vec<u8>> {
    let length =
        u32::try_from(out.len()).map_err(|_| WireError::InvalidLength(out.len() as i64))?;
    out[..HEADER_LEN].copy_from_slice(&Header::new(msg_type, length).to_bytes());
    Ok(out)
}

fn write_len(out: &mut Vec<u8>, n: usize) -> Result<()> {
    let n = i32::try_from(n).map_err(|_| WireError::InvalidLength(n as i64))?;
    out.write_i32::<LittleEndian>(n)?;
    Ok(())
}

fn write_cstr(out: &mut Vec<u8>, s: &str) -> Result<()> {
    if s.as_bytes().contains(&0) {
        return Err(WireError::Malformed(format!("embedded NUL in {s:?}")));
    }
    out.extend_from_slice(s.as_bytes());
    out.push(0);
    Ok(())
}

fn write_elements(out: &mut Vec<u8>, storage: &Storage) -> Result<()> {
    match storage {
        Storage::Boolean(v) => out.extend(v.iter().map(|&b| u8::from(b))),
        Storage::Guid(v) => v.iter().for_each(|g| out.extend_from_slice(g)),
        Storage::Byte(v) | Storage::Char(v) => out.extend_from_slice(v),
        Storage::Short(v) => {
            for &x in v {
                out.write_i16::<LittleEndian>(x)?;
            }
        }
        Storage::Int(v) => {
            for &x in v {
                out.write_i32::<LittleEndian>(x)?;
            }
        }
        Storage::Long(v) => {
            for &x in v {
                out.write_i64::<LittleEndian>(x)?;
            }
        }
        Storage::Real(v) => {
            for &x in v {
                out.write_f32::<LittleEndian>(x)?;
            }
        }
        Storage::Float(v) => {
            for &x in v {
                out.write_f64::<LittleEndian>(x)?;
            }
        }
        Storage::Symbol(v) => {
            for s in v {
                write_cstr(out, s)?;
            }
        }
        Storage::Children(_) | Storage::Message(_) => {
            return Err(WireError::Malformed("compound storage in a vector".into()))
        }
    }
    Ok(())
}

fn write_object(out: &mut Vec<u8>, block: &Block) -> Result<()> {
    let tag = block.tag();
    let children = block.children();
    match block.struct_type() {
        StructType::Error => {
            out.push(ERROR_TAG as u8);
            write_cstr(out, block.message().unwrap_or_default())?;
        }
        StructType::Atom => {
            out.push(tag as u8);
            write_elements(out, block.storage())?;
        }
        StructType::Vector => {
            out.push(tag as u8);
            out.push(block.attribute().to_byte());
            write_len(out, block.storage().len())?;
            write_elements(out, block.storage())?;
        }
        StructType::List => {
            out.push(0);
            out.push(block.attribute().to_byte());
            write_len(out, children.len())?;
            for child in children {
                write_object(out, child)?;
            }
        }
        StructType::Table => {
            out.push(98);
            out.push(block.attribute().to_byte());
            out.push(99);
            for child in children {
                write_object(out, child)?;
            }
        }
        StructType::Dictionary => {
            let sorted = block.attribute() == Attribute::Sorted;
            out.push(if sorted { SORTED_DICT_TAG as u8 } else { 99 });
            for child in children {
                write_object(out, child)?;
            }
        }
        StructType::Unknown => match (tag, block.storage()) {
            (100, _) => {
                let [context, body] = children else {
                    return Err(WireError::Malformed("lambda without context and body".into()));
                };
                out.push(100);
                let name = match context.storage() {
                    Storage::Symbol(s) => s.first().map(String::as_str).unwrap_or_default(),
                    _ => "",
                };
                write_cstr(out, name)?;
                write_object(out, body)?;
            }
            (101..=103, Storage::Byte(b)) => {
                out.push(tag as u8);
                out.extend_from_slice(b);
            }
            (104 | 105, _) => {
                out.push(tag as u8);
                write_len(out, children.len())?;
                for child in children {
                    write_object(out, child)?;
                }
            }
            (106..=111, _) => {
                let [inner] = children else {
                    return Err(WireError::Malformed("adverb without operand".into()));
                };
                out.push(tag as u8);
                write_object(out, inner)?;
            }
            _ => return Err(WireError::UnsupportedType(tag)),
        },
    }
    Ok(())
}

//! Deserialization of kdb+ objects
//!
//! The decoder is generic over the payload byte order. Lengths are checked
//! against the remaining input before anything is allocated, and nesting is
//! capped at [`MAX_DEPTH`] levels.

use std::marker::PhantomData;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use qlink_core::{Attribute, Block, BlockRef, Storage, StructType, Symbol, Type, ERROR_TAG};

use crate::error::{Result, WireError};

/// Deepest nesting the decoder accepts.
pub const MAX_DEPTH: usize = 128;

/// Decode one object from an uncompressed message body.
pub fn decode(body: &[u8], little_endian: bool) -> Result<BlockRef> {
    if little_endian {
        Decoder::<LittleEndian>::new(body).object()
    } else {
        Decoder::<BigEndian>::new(body).object()
    }
}

struct Decoder<'a, B> {
    buf: &'a [u8],
    pos: usize,
    depth: usize,
    _order: PhantomData<B>,
}

impl<'a, B: ByteOrder> Decoder<'a, B> {
    fn new(buf: &'a [u8]) -> Self {
        Decoder {
            buf,
            pos: 0,
            depth: 0,
            _order: PhantomData,
        }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(WireError::Truncated { offset: self.pos });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(B::read_i32(self.take(4)?))
    }

    /// Element count, checked so that `count * width` bytes are available.
    fn count(&mut self, width: usize) -> Result<usize> {
        let n = self.i32()?;
        if n < 0 {
            return Err(WireError::InvalidLength(i64::from(n)));
        }
        let n = n as usize;
        match n.checked_mul(width) {
            Some(bytes) if bytes <= self.remaining() => Ok(n),
            _ => Err(WireError::Truncated { offset: self.pos }),
        }
    }

    /// Null-terminated string.
    fn symbol(&mut self) -> Result<String> {
        let rest = &self.buf[self.pos..];
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(WireError::Truncated { offset: self.buf.len() })?;
        let s = std::str::from_utf8(&rest[..end]).map_err(|_| WireError::InvalidUtf8)?;
        self.pos += end + 1;
        Ok(s.to_owned())
    }

    /// `n` elements of primitive type `ty`.
    fn elements(&mut self, ty: Type, n: usize) -> Result<Storage> {
        let storage = match ty {
            Type::Boolean => Storage::Boolean(self.take(n)?.iter().map(|&b| b != 0).collect()),
            Type::Guid => {
                let raw = self.take(n * 16)?;
                Storage::Guid(
                    raw.chunks_exact(16)
                        .map(|c| {
                            let mut g = [0u8; 16];
                            g.copy_from_slice(c);
                            g
                        })
                        .collect(),
                )
            }
            Type::Byte => Storage::Byte(self.take(n)?.to_vec()),
            Type::Char => Storage::Char(self.take(n)?.to_vec()),
            Type::Short => {
                let raw = self.take(n * 2)?;
                let mut v = vec![0i16; n];
                B::read_i16_into(raw, &mut v);
                Storage::Short(v)
            }
            Type::Int | Type::Month | Type::Date | Type::Minute | Type::Second | Type::Time => {
                let raw = self.take(n * 4)?;
                let mut v = vec![0i32; n];
                B::read_i32_into(raw, &mut v);
                Storage::Int(v)
            }
            Type::Long | Type::Timestamp | Type::Timespan => {
                let raw = self.take(n * 8)?;
                let mut v = vec![0i64; n];
                B::read_i64_into(raw, &mut v);
                Storage::Long(v)
            }
            Type::Real => {
                let raw = self.take(n * 4)?;
                let mut v = vec![0f32; n];
                B::read_f32_into(raw, &mut v);
                Storage::Real(v)
            }
            Type::Float | Type::Datetime => {
                let raw = self.take(n * 8)?;
                let mut v = vec![0f64; n];
                B::read_f64_into(raw, &mut v);
                Storage::Float(v)
            }
            Type::Symbol => {
                let mut v = Vec::with_capacity(n);
                for _ in 0..n {
                    v.push(self.symbol()?);
                }
                Storage::Symbol(v)
            }
            Type::List | Type::Table | Type::Dict | Type::Function | Type::Error => {
                return Err(WireError::UnsupportedType(ty.code()))
            }
        };
        Ok(storage)
    }

    fn children(&mut self, n: usize) -> Result<Vec<BlockRef>> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.object()?);
        }
        Ok(out)
    }

    fn object(&mut self) -> Result<BlockRef> {
        if self.depth >= MAX_DEPTH {
            return Err(WireError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let out = self.object_inner();
        self.depth -= 1;
        out.map(Block::into_ref)
    }

    fn object_inner(&mut self) -> Result<Block> {
        let tag = self.byte()? as i8;
        match tag {
            ERROR_TAG => Ok(Block::error(self.symbol()?)),
            t if t < 0 => {
                let ty = Type::from_tag(t).ok_or(WireError::UnsupportedType(t))?;
                let storage = self.elements(ty, 1)?;
                Ok(Block::new(t, Attribute::None, storage)?)
            }
            0 => {
                let attr = Attribute::from_byte(self.byte()?);
                // Every child takes at least one byte.
                let n = self.count(1)?;
                Ok(Block::list(self.children(n)?).with_attribute(attr))
            }
            1..=19 => {
                let ty = Type::from_tag(tag).ok_or(WireError::UnsupportedType(tag))?;
                let attr = Attribute::from_byte(self.byte()?);
                let n = self.count(ty.element_width().unwrap_or(1))?;
                let storage = self.elements(ty, n)?;
                Ok(Block::new(tag, attr, storage)?)
            }
            98 => {
                let attr = Attribute::from_byte(self.byte()?);
                let dict = self.object()?;
                if dict.struct_type() != StructType::Dictionary {
                    return Err(WireError::Malformed(format!(
                        "table wraps {} instead of a dictionary",
                        dict.struct_type()
                    )));
                }
                let parts = dict.children().to_vec();
                Ok(Block::new(tag, attr, Storage::Children(parts))?)
            }
            99 | 127 => {
                let keys = self.object()?;
                let values = self.object()?;
                let attr = if tag == 127 {
                    Attribute::Sorted
                } else {
                    Attribute::None
                };
                Ok(Block::dict(keys, values).with_attribute(attr))
            }
            100 => {
                let context = Block::atom::<Symbol>(self.symbol()?).into_ref();
                let body = self.object()?;
                Ok(Block::new(tag, Attribute::None, Storage::Children(vec![context, body]))?)
            }
            101..=103 => {
                let b = self.byte()?;
                Ok(Block::new(tag, Attribute::None, Storage::Byte(vec![b]))?)
            }
            104 | 105 => {
                let n = self.count(1)?;
                let parts = self.children(n)?;
                Ok(Block::new(tag, Attribute::None, Storage::Children(parts))?)
            }
            106..=111 => {
                let inner = self.object()?;
                Ok(Block::new(tag, Attribute::None, Storage::Children(vec![inner]))?)
            }
            _ => Err(WireError::UnsupportedType(tag)),
        }
    }
}

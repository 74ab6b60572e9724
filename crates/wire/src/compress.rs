//! IPC message compression
//!
//! kdb+ compresses large messages with a byte-oriented LZ scheme. A
//! compressed body starts with the uncompressed message length (header
//! included), followed by groups of up to eight tokens, each group led by
//! a flag byte. Bit `k` of the flag says whether token `k` is a literal
//! byte (0) or a back-reference (1). A back-reference is a hash byte
//! selecting an earlier position plus an extra length: it copies two bytes
//! from that position and then `extra` more.
//!
//! Both sides maintain the same table, keyed by the XOR of adjacent
//! bytes, of the last position each pair was seen at.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{Result, WireError};
use crate::header::{Header, HEADER_LEN};

/// Longest extra length a back-reference can carry.
const MAX_EXTRA: usize = 255;

fn next(src: &[u8], d: &mut usize) -> Result<u8> {
    let b = *src.get(*d).ok_or(WireError::Compression("truncated token stream"))?;
    *d += 1;
    Ok(b)
}

/// Expand the body of a compressed message.
///
/// `body` is everything after the header. Returns the uncompressed body.
pub fn decompress(body: &[u8], little_endian: bool) -> Result<Vec<u8>> {
    if body.len() < 4 {
        return Err(WireError::Truncated { offset: body.len() });
    }
    let total = if little_endian {
        LittleEndian::read_i32(&body[..4])
    } else {
        BigEndian::read_i32(&body[..4])
    };
    if total < HEADER_LEN as i32 {
        return Err(WireError::InvalidLength(i64::from(total)));
    }
    let total = total as usize;
    // Each token expands to at most 257 bytes from two or more input bytes.
    if total - HEADER_LEN > body.len().saturating_mul(MAX_EXTRA + 2) {
        return Err(WireError::Compression("declared length exceeds what the body can expand to"));
    }

    let mut dst = vec![0u8; total];
    let mut table = [0usize; 256];
    let (mut s, mut p, mut d) = (HEADER_LEN, HEADER_LEN, 4usize);
    let (mut flags, mut bit) = (0u8, 0u8);

    while s < total {
        if bit == 0 {
            flags = next(body, &mut d)?;
            bit = 1;
        }
        let mut extra = 0;
        let matched = flags & bit != 0;
        if matched {
            let r = table[usize::from(next(body, &mut d)?)];
            if r == 0 || s + 2 > total {
                return Err(WireError::Compression("invalid back-reference"));
            }
            dst[s] = dst[r];
            dst[s + 1] = dst[r + 1];
            s += 2;
            extra = usize::from(next(body, &mut d)?);
            if s + extra > total {
                return Err(WireError::Compression("back-reference past end of message"));
            }
            // Byte by byte: source and destination may overlap.
            for m in 0..extra {
                dst[s + m] = dst[r + 2 + m];
            }
        } else {
            dst[s] = next(body, &mut d)?;
            s += 1;
        }
        while p + 1 < s {
            table[usize::from(dst[p] ^ dst[p + 1])] = p;
            p += 1;
        }
        if matched {
            s += extra;
            p = s;
        }
        bit <<= 1;
    }

    dst.drain(..HEADER_LEN);
    Ok(dst)
}

/// Compress a complete little-endian message.
///
/// Returns `None` unless the result is at most half the original size.
pub fn compress(message: &[u8]) -> Option<Vec<u8>> {
    let total = message.len();
    if total <= HEADER_LEN + 4 || message[0] != 1 {
        return None;
    }
    let limit = total / 2;
    let total_i32 = i32::try_from(total).ok()?;

    let mut out = Vec::with_capacity(limit + 8);
    out.extend_from_slice(&[0u8; HEADER_LEN]);
    out.extend_from_slice(&total_i32.to_le_bytes());

    let src = message;
    let mut table = [0usize; 256];
    let (mut s, mut p) = (HEADER_LEN, HEADER_LEN);
    let (mut flag_pos, mut bit) = (0usize, 0u8);

    while s < total {
        if bit == 0 {
            if out.len() > limit {
                return None;
            }
            flag_pos = out.len();
            out.push(0);
            bit = 1;
        }

        let mut matched = None;
        if s + 1 < total {
            let h = src[s] ^ src[s + 1];
            let r = table[usize::from(h)];
            if r != 0 && src[r] == src[s] && src[r + 1] == src[s + 1] {
                let mut extra = 0;
                while extra < MAX_EXTRA
                    && s + 2 + extra < total
                    && src[r + 2 + extra] == src[s + 2 + extra]
                {
                    extra += 1;
                }
                matched = Some((h, extra));
            }
        }

        match matched {
            Some((h, extra)) => {
                out[flag_pos] |= bit;
                out.push(h);
                out.push(extra as u8);
                s += 2;
                while p + 1 < s {
                    table[usize::from(src[p] ^ src[p + 1])] = p;
                    p += 1;
                }
                s += extra;
                p = s;
            }
            None => {
                out.push(src[s]);
                s += 1;
                while p + 1 < s {
                    table[usize::from(src[p] ^ src[p + 1])] = p;
                    p += 1;
                }
            }
        }
        bit <<= 1;
    }

    if out.len() > limit {
        return None;
    }
    let mut header = Header::parse(&[message[0], message[1], 0, 0, 8, 0, 0, 0]).ok()?;
    header.compressed = true;
    header.length = u32::try_from(out.len()).ok()?;
    out[..HEADER_LEN].copy_from_slice(&header.to_bytes());
    Some(out)
}

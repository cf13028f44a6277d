//! SQLite variable-length integers.
//!
//! A varint is 1 to 9 bytes, most significant group first. Each of the first
//! eight bytes contributes its low 7 bits and uses the high bit as a
//! continuation flag; a ninth byte, when reached, contributes all 8 bits.

use std::io::Read;

use crate::types::error::{DatabaseError, Result};

pub const MAX_VARINT_SIZE: usize = 9;

const CONTINUATION_BIT: u8 = 0x80;
const GROUP_MASK: u8 = 0x7f;

/// Decodes a varint from the start of `buf`, returning the value and the
/// number of bytes consumed.
pub fn decode_varint(buf: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    for i in 0..MAX_VARINT_SIZE - 1 {
        let Some(&byte) = buf.get(i) else {
            return Err(truncated());
        };
        value = (value << 7) | u64::from(byte & GROUP_MASK);
        if byte & CONTINUATION_BIT == 0 {
            return Ok((value, i + 1));
        }
    }
    match buf.get(MAX_VARINT_SIZE - 1) {
        Some(&byte) => Ok(((value << 8) | u64::from(byte), MAX_VARINT_SIZE)),
        None => Err(truncated()),
    }
}

/// Decodes a varint at `*cursor` and advances the cursor past it.
pub fn decode_varint_at(buf: &[u8], cursor: &mut usize) -> Result<u64> {
    let rest = buf.get(*cursor..).ok_or_else(truncated)?;
    let (value, len) = decode_varint(rest)?;
    *cursor += len;
    Ok(value)
}

/// Reads a varint from a live stream, leaving the stream positioned right
/// after its last byte.
pub fn read_varint<R: Read>(reader: &mut R) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    let mut byte = [0u8; 1];
    for i in 0..MAX_VARINT_SIZE - 1 {
        read_byte(reader, &mut byte)?;
        value = (value << 7) | u64::from(byte[0] & GROUP_MASK);
        if byte[0] & CONTINUATION_BIT == 0 {
            return Ok((value, i + 1));
        }
    }
    read_byte(reader, &mut byte)?;
    Ok(((value << 8) | u64::from(byte[0]), MAX_VARINT_SIZE))
}

/// Encodes `value` in the shortest varint form.
pub fn encode_varint(value: u64) -> Vec<u8> {
    // Anything above 56 bits needs the full nine bytes.
    if value >> 56 != 0 {
        let mut out = vec![0u8; MAX_VARINT_SIZE];
        out[MAX_VARINT_SIZE - 1] = value as u8;
        let mut rest = value >> 8;
        for slot in out[..MAX_VARINT_SIZE - 1].iter_mut().rev() {
            *slot = (rest as u8 & GROUP_MASK) | CONTINUATION_BIT;
            rest >>= 7;
        }
        return out;
    }

    let mut out = Vec::with_capacity(MAX_VARINT_SIZE);
    let mut rest = value;
    loop {
        out.push((rest as u8 & GROUP_MASK) | CONTINUATION_BIT);
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }
    out[0] &= GROUP_MASK;
    out.reverse();
    out
}

pub fn varint_len(value: u64) -> usize {
    encode_varint(value).len()
}

fn read_byte<R: Read>(reader: &mut R, byte: &mut [u8; 1]) -> Result<()> {
    reader.read_exact(byte).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => truncated(),
        _ => DatabaseError::Io(e),
    })
}

fn truncated() -> DatabaseError {
    DatabaseError::UnexpectedEof {
        context: "varint".to_string(),
    }
}

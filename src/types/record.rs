/* Record Format:
Documentation: https://sqlite.org/fileformat2.html#record_format

┌────┬────┬────┬─────┬────┬────┬────┬─────
│ HS │ S1 │ S2 │ ... │ SN │ V1 │ V2 │ ...
└────┴────┴────┴─────┴────┴────┴────┴─────
│<──────── Header ──────>│<──── Body ─────>

HS = header size varint (counts its own bytes)
Sx = serial type varint of column x
Vx = column value, laid out per its serial type
*/

use crate::types::{
    PageId, RowId,
    error::{DatabaseError, Result},
    page::PageType,
    value::Value,
    varint::decode_varint_at,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialType {
    Null,
    I8,
    I16,
    I24,
    I32,
    I48,
    I64,
    F64,
    Zero,
    One,
    Blob(usize),
    Text(usize),
}

impl SerialType {
    pub fn from_code(code: u64) -> Result<Self> {
        match code {
            0 => Ok(SerialType::Null),
            1 => Ok(SerialType::I8),
            2 => Ok(SerialType::I16),
            3 => Ok(SerialType::I24),
            4 => Ok(SerialType::I32),
            5 => Ok(SerialType::I48),
            6 => Ok(SerialType::I64),
            7 => Ok(SerialType::F64),
            8 => Ok(SerialType::Zero),
            9 => Ok(SerialType::One),
            10 | 11 => Err(DatabaseError::InvalidRecord {
                details: format!("reserved serial type {code}"),
            }),
            n if n % 2 == 0 => Ok(SerialType::Blob(((n - 12) / 2) as usize)),
            n => Ok(SerialType::Text(((n - 13) / 2) as usize)),
        }
    }

    pub fn code(&self) -> u64 {
        match self {
            SerialType::Null => 0,
            SerialType::I8 => 1,
            SerialType::I16 => 2,
            SerialType::I24 => 3,
            SerialType::I32 => 4,
            SerialType::I48 => 5,
            SerialType::I64 => 6,
            SerialType::F64 => 7,
            SerialType::Zero => 8,
            SerialType::One => 9,
            SerialType::Blob(len) => 12 + 2 * *len as u64,
            SerialType::Text(len) => 13 + 2 * *len as u64,
        }
    }

    /// Number of body bytes the value occupies.
    pub fn size(&self) -> usize {
        match self {
            SerialType::Null | SerialType::Zero | SerialType::One => 0,
            SerialType::I8 => 1,
            SerialType::I16 => 2,
            SerialType::I24 => 3,
            SerialType::I32 => 4,
            SerialType::I48 => 6,
            SerialType::I64 | SerialType::F64 => 8,
            SerialType::Blob(len) | SerialType::Text(len) => *len,
        }
    }

    /// Decodes a value from exactly `self.size()` bytes.
    pub fn decode(&self, bytes: &[u8]) -> Result<Value> {
        if bytes.len() != self.size() {
            return Err(DatabaseError::InvalidRecord {
                details: format!(
                    "serial type {} needs {} bytes, got {}",
                    self.code(),
                    self.size(),
                    bytes.len()
                ),
            });
        }
        let value = match self {
            SerialType::Null => Value::Null,
            SerialType::Zero => Value::Integer(0),
            SerialType::One => Value::Integer(1),
            SerialType::I8
            | SerialType::I16
            | SerialType::I24
            | SerialType::I32
            | SerialType::I48
            | SerialType::I64 => Value::Integer(decode_signed_be(bytes)),
            SerialType::F64 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                Value::Real(f64::from_be_bytes(raw))
            }
            SerialType::Blob(_) => Value::Blob(bytes.to_vec()),
            SerialType::Text(_) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        };
        Ok(value)
    }
}

/// Big-endian two's complement integer of 1 to 8 bytes.
pub fn decode_signed_be(bytes: &[u8]) -> i64 {
    let width = bytes.len() * 8;
    let raw = bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
    if width == 0 || width >= 64 {
        return raw as i64;
    }
    if raw & (1u64 << (width - 1)) != 0 {
        raw as i64 - (1i64 << width)
    } else {
        raw as i64
    }
}

/// A decoded record: the serial types from its header and the values from
/// its body, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub serial_types: Vec<SerialType>,
    pub values: Vec<Value>,
}

impl Record {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut cursor = 0;
        let header_size = decode_varint_at(payload, &mut cursor)? as usize;
        if header_size < cursor || header_size > payload.len() {
            return Err(DatabaseError::InvalidRecord {
                details: format!(
                    "header size {header_size} outside payload of {} bytes",
                    payload.len()
                ),
            });
        }

        let header = &payload[..header_size];
        let mut serial_types = Vec::new();
        while cursor < header_size {
            let code = decode_varint_at(header, &mut cursor)?;
            serial_types.push(SerialType::from_code(code)?);
        }

        let mut body_cursor = header_size;
        let mut values = Vec::with_capacity(serial_types.len());
        for serial_type in &serial_types {
            let end = body_cursor + serial_type.size();
            let bytes = payload
                .get(body_cursor..end)
                .ok_or_else(|| DatabaseError::UnexpectedEof {
                    context: "record body".to_string(),
                })?;
            values.push(serial_type.decode(bytes)?);
            body_cursor = end;
        }

        Ok(Self {
            serial_types,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

/// A decoded table B-tree leaf cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLeafCell {
    pub row_id: RowId,
    pub record: Record,
}

/// A decoded index B-tree cell. Interior cells carry the left child pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexCell {
    pub left_child: Option<PageId>,
    pub record: Record,
}

impl IndexCell {
    /// The indexed key: the first value of the record.
    pub fn key(&self) -> Result<&Value> {
        self.record.get(0).ok_or_else(|| DatabaseError::InvalidRecord {
            details: "index record has no key".to_string(),
        })
    }

    /// The rowid the entry points at: the last value of the record.
    pub fn row_id(&self) -> Result<RowId> {
        match self.record.values.last() {
            Some(value) => value.as_integer().ok_or_else(|| DatabaseError::InvalidIndexRowId {
                details: format!("{value:?}"),
            }),
            None => Err(DatabaseError::InvalidIndexRowId {
                details: "empty index record".to_string(),
            }),
        }
    }
}

/// Number of payload bytes stored on the B-tree page itself; the remainder
/// lives in the overflow chain.
pub fn local_payload_size(page_type: PageType, payload_size: usize, usable_size: usize) -> usize {
    let max_local = if page_type.is_table() {
        usable_size - 35
    } else {
        (usable_size - 12) * 64 / 255 - 23
    };
    if payload_size <= max_local {
        return payload_size;
    }
    let min_local = (usable_size - 12) * 32 / 255 - 23;
    let surplus = min_local + (payload_size - min_local) % (usable_size - 4);
    if surplus <= max_local { surplus } else { min_local }
}

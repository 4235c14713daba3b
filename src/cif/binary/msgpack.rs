//! Minimal MessagePack value tree, enough for the BinaryCIF envelope.

use byteorder::{BigEndian, ByteOrder};
use rmp::Marker;

use super::DecodeError;

/// A decoded MessagePack value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// nil
    Nil,
    /// true / false
    Bool(bool),
    /// Negative or signed integer
    Int(i64),
    /// Unsigned integer
    Uint(u64),
    /// Single precision float
    F32(f32),
    /// Double precision float
    F64(f64),
    /// UTF-8 string
    Str(String),
    /// Raw bytes
    Bin(Vec<u8>),
    /// Array
    Array(Vec<Value>),
    /// Map with keys in encoding order
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Value under a string key of a map
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(pairs) => pairs
                .iter()
                .find(|(k, _)| matches!(k, Value::Str(s) if s == key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Whether the value is nil
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// String content
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content, from either integer family
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Uint(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Numeric content as a float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            Value::F32(v) => Some(f64::from(*v)),
            Value::Int(v) => Some(*v as f64),
            Value::Uint(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Boolean content
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Array items
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Raw bytes
    pub fn as_bin(&self) -> Option<&[u8]> {
        match self {
            Value::Bin(b) => Some(b),
            _ => None,
        }
    }
}

/// Decode one MessagePack value from the start of `bytes`
pub fn decode(bytes: &[u8]) -> Result<Value, DecodeError> {
    Reader { bytes, pos: 0 }.value()
}

struct Reader<'b> {
    bytes: &'b [u8],
    pos: usize,
}

impl<'b> Reader<'b> {
    fn take(&mut self, n: usize) -> Result<&'b [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                DecodeError::Msgpack(format!(
                    "unexpected end of data: need {n} bytes at offset {}",
                    self.pos
                ))
            })?;
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    fn marker(&mut self) -> Result<Marker, DecodeError> {
        let mut rd = &self.bytes[self.pos..];
        let marker = rmp::decode::read_marker(&mut rd)
            .map_err(|e| DecodeError::Msgpack(format!("bad marker at offset {}: {e:?}", self.pos)))?;
        self.pos += 1;
        Ok(marker)
    }

    fn value(&mut self) -> Result<Value, DecodeError> {
        let value = match self.marker()? {
            Marker::Null => Value::Nil,
            Marker::True => Value::Bool(true),
            Marker::False => Value::Bool(false),
            Marker::FixPos(v) => Value::Uint(u64::from(v)),
            Marker::FixNeg(v) => Value::Int(i64::from(v)),
            Marker::U8 => Value::Uint(u64::from(self.u8()?)),
            Marker::U16 => Value::Uint(u64::from(self.u16()?)),
            Marker::U32 => Value::Uint(u64::from(self.u32()?)),
            Marker::U64 => Value::Uint(BigEndian::read_u64(self.take(8)?)),
            Marker::I8 => Value::Int(i64::from(self.u8()? as i8)),
            Marker::I16 => Value::Int(i64::from(BigEndian::read_i16(self.take(2)?))),
            Marker::I32 => Value::Int(i64::from(BigEndian::read_i32(self.take(4)?))),
            Marker::I64 => Value::Int(BigEndian::read_i64(self.take(8)?)),
            Marker::F32 => Value::F32(BigEndian::read_f32(self.take(4)?)),
            Marker::F64 => Value::F64(BigEndian::read_f64(self.take(8)?)),
            Marker::FixStr(len) => self.string(usize::from(len))?,
            Marker::Str8 => {
                let len = usize::from(self.u8()?);
                self.string(len)?
            }
            Marker::Str16 => {
                let len = usize::from(self.u16()?);
                self.string(len)?
            }
            Marker::Str32 => {
                let len = self.u32()? as usize;
                self.string(len)?
            }
            Marker::Bin8 => {
                let len = usize::from(self.u8()?);
                Value::Bin(self.take(len)?.to_vec())
            }
            Marker::Bin16 => {
                let len = usize::from(self.u16()?);
                Value::Bin(self.take(len)?.to_vec())
            }
            Marker::Bin32 => {
                let len = self.u32()? as usize;
                Value::Bin(self.take(len)?.to_vec())
            }
            Marker::FixArray(len) => self.array(usize::from(len))?,
            Marker::Array16 => {
                let len = usize::from(self.u16()?);
                self.array(len)?
            }
            Marker::Array32 => {
                let len = self.u32()? as usize;
                self.array(len)?
            }
            Marker::FixMap(len) => self.map(usize::from(len))?,
            Marker::Map16 => {
                let len = usize::from(self.u16()?);
                self.map(len)?
            }
            Marker::Map32 => {
                let len = self.u32()? as usize;
                self.map(len)?
            }
            other => {
                return Err(DecodeError::Msgpack(format!(
                    "unsupported marker {other:?}"
                )))
            }
        };
        Ok(value)
    }

    fn string(&mut self, len: usize) -> Result<Value, DecodeError> {
        let bytes = self.take(len)?;
        let s = std::str::from_utf8(bytes)
            .map_err(|e| DecodeError::Msgpack(format!("invalid UTF-8 string: {e}")))?;
        Ok(Value::Str(s.to_string()))
    }

    fn array(&mut self, len: usize) -> Result<Value, DecodeError> {
        // every item takes at least one byte
        let mut items = Vec::with_capacity(len.min(self.remaining()));
        for _ in 0..len {
            items.push(self.value()?);
        }
        Ok(Value::Array(items))
    }

    fn map(&mut self, len: usize) -> Result<Value, DecodeError> {
        let mut pairs = Vec::with_capacity(len.min(self.remaining() / 2));
        for _ in 0..len {
            let key = self.value()?;
            let value = self.value()?;
            pairs.push((key, value));
        }
        Ok(Value::Map(pairs))
    }
}

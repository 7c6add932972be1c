//! # Typed Value Decoder
//!
//! Decodes the value span of a channel record according to its `Type` byte.
//! All multi-byte values are little-endian; signed integers are two's
//! complement and floats are IEEE-754 bit patterns.

use std::fmt;

use serde::Serialize;

use super::protocol::DataType;
use crate::error::UnknownChannelType;

/// Decoded channel value, one variant per numeric data type
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    F32(f32),
    F64(f64),
}

impl Value {
    /// The zero value of a data type
    pub fn zero(data_type: DataType) -> Self {
        match data_type {
            DataType::UnsignedChar => Value::U8(0),
            DataType::SignedChar => Value::I8(0),
            DataType::UnsignedShort => Value::U16(0),
            DataType::SignedShort => Value::I16(0),
            DataType::UnsignedLong => Value::U32(0),
            DataType::SignedLong => Value::I32(0),
            DataType::Float => Value::F32(0.0),
            DataType::Double => Value::F64(0.0),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Value::U8(_) => DataType::UnsignedChar,
            Value::I8(_) => DataType::SignedChar,
            Value::U16(_) => DataType::UnsignedShort,
            Value::I16(_) => DataType::SignedShort,
            Value::U32(_) => DataType::UnsignedLong,
            Value::I32(_) => DataType::SignedLong,
            Value::F32(_) => DataType::Float,
            Value::F64(_) => DataType::Double,
        }
    }

    /// Widen to `f64` (lossless for every variant except large `f64` itself)
    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::U8(v) => v as f64,
            Value::I8(v) => v as f64,
            Value::U16(v) => v as f64,
            Value::I16(v) => v as f64,
            Value::U32(v) => v as f64,
            Value::I32(v) => v as f64,
            Value::F32(v) => v as f64,
            Value::F64(v) => v,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::U8(v) => write!(f, "{}", v),
            Value::I8(v) => write!(f, "{}", v),
            Value::U16(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
        }
    }
}

/// Decode a value span for a known data type
///
/// A span whose length is not exactly the type's width decodes to the
/// type's zero value; nothing is partially read.
pub fn decode_typed(data_type: DataType, bytes: &[u8]) -> Value {
    if bytes.len() != data_type.width() {
        return Value::zero(data_type);
    }

    match data_type {
        DataType::UnsignedChar => Value::U8(bytes[0]),
        DataType::SignedChar => Value::I8(bytes[0] as i8),
        DataType::UnsignedShort => Value::U16(u16::from_le_bytes([bytes[0], bytes[1]])),
        DataType::SignedShort => Value::I16(i16::from_le_bytes([bytes[0], bytes[1]])),
        DataType::UnsignedLong => Value::U32(u32::from_le_bytes(array4(bytes))),
        DataType::SignedLong => Value::I32(i32::from_le_bytes(array4(bytes))),
        DataType::Float => Value::F32(f32::from_le_bytes(array4(bytes))),
        DataType::Double => Value::F64(f64::from_le_bytes(array8(bytes))),
    }
}

/// Decode a value span by its raw `Type` byte
///
/// # Errors
///
/// Returns [`UnknownChannelType`] if `type_tag` is not one of the eight
/// numeric types. A width mismatch on a known type is not an error.
///
/// # Examples
///
/// ```
/// use umb_poller::umb::value::{decode, Value};
///
/// let value = decode(0x16, &[0x66, 0x66, 0x96, 0xC1]).unwrap();
/// assert!(matches!(value, Value::F32(v) if (v + 18.8).abs() < 0.001));
///
/// // Wrong width: zero, no error
/// assert_eq!(decode(0x12, &[0x01]).unwrap(), Value::U16(0));
///
/// assert!(decode(0x20, &[0x01]).is_err());
/// ```
pub fn decode(type_tag: u8, bytes: &[u8]) -> Result<Value, UnknownChannelType> {
    let data_type = DataType::try_from(type_tag).map_err(UnknownChannelType)?;
    Ok(decode_typed(data_type, bytes))
}

// Callers have already checked the span width.
fn array4(bytes: &[u8]) -> [u8; 4] {
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}

fn array8(bytes: &[u8]) -> [u8; 8] {
    [
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]
}

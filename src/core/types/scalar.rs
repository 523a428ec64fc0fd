//! Fixed-width scalar types and values transferred across the process boundary

use super::address::unsigned_digits;
use super::error::{MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Shape of a single fixed-width read or write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl ScalarType {
    pub const ALL: [ScalarType; 10] = [
        ScalarType::I8,
        ScalarType::I16,
        ScalarType::I32,
        ScalarType::I64,
        ScalarType::U8,
        ScalarType::U16,
        ScalarType::U32,
        ScalarType::U64,
        ScalarType::F32,
        ScalarType::F64,
    ];

    /// Size in bytes of one value of this type
    pub const fn size(self) -> usize {
        match self {
            ScalarType::I8 | ScalarType::U8 => 1,
            ScalarType::I16 | ScalarType::U16 => 2,
            ScalarType::I32 | ScalarType::U32 | ScalarType::F32 => 4,
            ScalarType::I64 | ScalarType::U64 | ScalarType::F64 => 8,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ScalarType::I8 => "i8",
            ScalarType::I16 => "i16",
            ScalarType::I32 => "i32",
            ScalarType::I64 => "i64",
            ScalarType::U8 => "u8",
            ScalarType::U16 => "u16",
            ScalarType::U32 => "u32",
            ScalarType::U64 => "u64",
            ScalarType::F32 => "f32",
            ScalarType::F64 => "f64",
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, ScalarType::F32 | ScalarType::F64)
    }

    /// Interprets exactly `size()` little-endian bytes as a value of this type
    pub fn decode(self, bytes: &[u8]) -> Option<ScalarValue> {
        if bytes.len() != self.size() {
            return None;
        }
        let value = match self {
            ScalarType::I8 => ScalarValue::I8(i8::from_le_bytes(bytes.try_into().ok()?)),
            ScalarType::I16 => ScalarValue::I16(i16::from_le_bytes(bytes.try_into().ok()?)),
            ScalarType::I32 => ScalarValue::I32(i32::from_le_bytes(bytes.try_into().ok()?)),
            ScalarType::I64 => ScalarValue::I64(i64::from_le_bytes(bytes.try_into().ok()?)),
            ScalarType::U8 => ScalarValue::U8(bytes[0]),
            ScalarType::U16 => ScalarValue::U16(u16::from_le_bytes(bytes.try_into().ok()?)),
            ScalarType::U32 => ScalarValue::U32(u32::from_le_bytes(bytes.try_into().ok()?)),
            ScalarType::U64 => ScalarValue::U64(u64::from_le_bytes(bytes.try_into().ok()?)),
            ScalarType::F32 => ScalarValue::F32(f32::from_le_bytes(bytes.try_into().ok()?)),
            ScalarType::F64 => ScalarValue::F64(f64::from_le_bytes(bytes.try_into().ok()?)),
        };
        Some(value)
    }

    /// Converts `value` into this type, refusing any conversion that loses information
    ///
    /// A value is accepted only when converting it back reproduces the
    /// original: 300 is not a `u8`, -1 is not a `u32`, 0.5 is not an
    /// integer, and 0.1f64 is not an `f32`. NaN is representable in both
    /// float types.
    pub fn coerce(self, value: ScalarValue) -> MemoryResult<ScalarValue> {
        let coerced = match value.number() {
            Number::Int(n) => self.exact_from_int(n),
            Number::Float(f) => self.exact_from_float(f),
        };
        coerced.ok_or_else(|| MemoryError::not_representable(value, self))
    }

    fn exact_from_int(self, n: i128) -> Option<ScalarValue> {
        match self {
            ScalarType::I8 => i8::try_from(n).ok().map(ScalarValue::I8),
            ScalarType::I16 => i16::try_from(n).ok().map(ScalarValue::I16),
            ScalarType::I32 => i32::try_from(n).ok().map(ScalarValue::I32),
            ScalarType::I64 => i64::try_from(n).ok().map(ScalarValue::I64),
            ScalarType::U8 => u8::try_from(n).ok().map(ScalarValue::U8),
            ScalarType::U16 => u16::try_from(n).ok().map(ScalarValue::U16),
            ScalarType::U32 => u32::try_from(n).ok().map(ScalarValue::U32),
            ScalarType::U64 => u64::try_from(n).ok().map(ScalarValue::U64),
            ScalarType::F32 => {
                let f = n as f32;
                (f as i128 == n).then_some(ScalarValue::F32(f))
            }
            ScalarType::F64 => {
                let f = n as f64;
                (f as i128 == n).then_some(ScalarValue::F64(f))
            }
        }
    }

    fn exact_from_float(self, f: f64) -> Option<ScalarValue> {
        match self {
            ScalarType::F64 => Some(ScalarValue::F64(f)),
            ScalarType::F32 => {
                let narrowed = f as f32;
                (f.is_nan() || narrowed as f64 == f).then_some(ScalarValue::F32(narrowed))
            }
            _ => {
                if !f.is_finite() || f.fract() != 0.0 {
                    return None;
                }
                // `as` saturates, so the comparison rejects anything outside i128
                let n = f as i128;
                if n as f64 != f {
                    return None;
                }
                self.exact_from_int(n)
            }
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScalarType {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let scalar_type = match s.trim().to_ascii_lowercase().as_str() {
            "i8" | "int8" | "byte" | "char" => ScalarType::I8,
            "i16" | "int16" | "short" => ScalarType::I16,
            "i32" | "int32" | "int" | "long" => ScalarType::I32,
            "i64" | "int64" | "longlong" => ScalarType::I64,
            "u8" | "uint8" | "ubyte" | "uchar" => ScalarType::U8,
            "u16" | "uint16" | "ushort" => ScalarType::U16,
            "u32" | "uint32" | "uint" | "ulong" | "dword" => ScalarType::U32,
            "u64" | "uint64" | "ulonglong" | "qword" | "ptr" | "pointer" => ScalarType::U64,
            "f32" | "float" => ScalarType::F32,
            "f64" | "double" => ScalarType::F64,
            other => return Err(MemoryError::InvalidScalarType(other.to_string())),
        };
        Ok(scalar_type)
    }
}

/// Numeric view used for exact conversions between scalar types
#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i128),
    Float(f64),
}

/// A value of one of the [`ScalarType`]s
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ScalarValue {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl ScalarValue {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            ScalarValue::I8(_) => ScalarType::I8,
            ScalarValue::I16(_) => ScalarType::I16,
            ScalarValue::I32(_) => ScalarType::I32,
            ScalarValue::I64(_) => ScalarType::I64,
            ScalarValue::U8(_) => ScalarType::U8,
            ScalarValue::U16(_) => ScalarType::U16,
            ScalarValue::U32(_) => ScalarType::U32,
            ScalarValue::U64(_) => ScalarType::U64,
            ScalarValue::F32(_) => ScalarType::F32,
            ScalarValue::F64(_) => ScalarType::F64,
        }
    }

    /// Little-endian encoding, `scalar_type().size()` bytes long
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ScalarValue::I8(v) => v.to_le_bytes().to_vec(),
            ScalarValue::I16(v) => v.to_le_bytes().to_vec(),
            ScalarValue::I32(v) => v.to_le_bytes().to_vec(),
            ScalarValue::I64(v) => v.to_le_bytes().to_vec(),
            ScalarValue::U8(v) => v.to_le_bytes().to_vec(),
            ScalarValue::U16(v) => v.to_le_bytes().to_vec(),
            ScalarValue::U32(v) => v.to_le_bytes().to_vec(),
            ScalarValue::U64(v) => v.to_le_bytes().to_vec(),
            ScalarValue::F32(v) => v.to_le_bytes().to_vec(),
            ScalarValue::F64(v) => v.to_le_bytes().to_vec(),
        }
    }

    /// Parses text as a value of `scalar_type`
    ///
    /// Integers may be written in decimal or with a `0x` prefix. The same
    /// exactness rule as [`ScalarType::coerce`] applies.
    pub fn parse(text: &str, scalar_type: ScalarType) -> MemoryResult<Self> {
        let text = text.trim();
        let number = parse_number(text)
            .ok_or_else(|| MemoryError::InvalidValue(text.to_string()))?;
        let converted = match number {
            Number::Int(n) => scalar_type.exact_from_int(n),
            Number::Float(f) => scalar_type.exact_from_float(f),
        };
        converted.ok_or_else(|| MemoryError::not_representable(text, scalar_type))
    }

    fn number(&self) -> Number {
        match *self {
            ScalarValue::I8(v) => Number::Int(v.into()),
            ScalarValue::I16(v) => Number::Int(v.into()),
            ScalarValue::I32(v) => Number::Int(v.into()),
            ScalarValue::I64(v) => Number::Int(v.into()),
            ScalarValue::U8(v) => Number::Int(v.into()),
            ScalarValue::U16(v) => Number::Int(v.into()),
            ScalarValue::U32(v) => Number::Int(v.into()),
            ScalarValue::U64(v) => Number::Int(v.into()),
            ScalarValue::F32(v) => Number::Float(v.into()),
            ScalarValue::F64(v) => Number::Float(v),
        }
    }
}

fn parse_number(text: &str) -> Option<Number> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        let magnitude = i128::from_str_radix(unsigned_digits(hex)?, 16).ok()?;
        return Some(Number::Int(if negative { -magnitude } else { magnitude }));
    }
    if let Ok(n) = text.parse::<i128>() {
        return Some(Number::Int(n));
    }
    text.parse::<f64>().ok().map(Number::Float)
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::I8(v) => write!(f, "{}", v),
            ScalarValue::I16(v) => write!(f, "{}", v),
            ScalarValue::I32(v) => write!(f, "{}", v),
            ScalarValue::I64(v) => write!(f, "{}", v),
            ScalarValue::U8(v) => write!(f, "{}", v),
            ScalarValue::U16(v) => write!(f, "{}", v),
            ScalarValue::U32(v) => write!(f, "{}", v),
            ScalarValue::U64(v) => write!(f, "{}", v),
            ScalarValue::F32(v) => write!(f, "{}", v),
            ScalarValue::F64(v) => write!(f, "{}", v),
        }
    }
}

/// Rust primitives that map one-to-one onto a [`ScalarType`]
pub trait Scalar: Copy + Into<ScalarValue> {
    const TYPE: ScalarType;

    /// Extracts the primitive when `value` has exactly this type
    fn from_value(value: ScalarValue) -> Option<Self>;
}

macro_rules! impl_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for ScalarValue {
                fn from(value: $ty) -> Self {
                    ScalarValue::$variant(value)
                }
            }

            impl Scalar for $ty {
                const TYPE: ScalarType = ScalarType::$variant;

                fn from_value(value: ScalarValue) -> Option<Self> {
                    match value {
                        ScalarValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_scalar! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

//! Typed PLC values
//!
//! Every value returned by a driver carries exactly one kind. Drivers never
//! widen or narrow: an `INT` register comes back as [`PlcValue::Int16`], a
//! `REAL` as [`PlcValue::Float32`].

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::BTreeMap;
use std::fmt;

/// Value kind tag, one per [`PlcValue`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Byte,
    Uint8,
    Int8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float32,
    Float64,
    String,
    Time,
    Duration,
    Date,
    DateTime,
    List,
    Struct,
    RawBytes,
}

impl ValueKind {
    /// IEC 61131-3 style name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Null => "NULL",
            ValueKind::Bool => "BOOL",
            ValueKind::Byte => "BYTE",
            ValueKind::Uint8 => "USINT",
            ValueKind::Int8 => "SINT",
            ValueKind::Int16 => "INT",
            ValueKind::Uint16 => "UINT",
            ValueKind::Int32 => "DINT",
            ValueKind::Uint32 => "UDINT",
            ValueKind::Int64 => "LINT",
            ValueKind::Uint64 => "ULINT",
            ValueKind::Float32 => "REAL",
            ValueKind::Float64 => "LREAL",
            ValueKind::String => "STRING",
            ValueKind::Time => "TIME_OF_DAY",
            ValueKind::Duration => "TIME",
            ValueKind::Date => "DATE",
            ValueKind::DateTime => "DATE_AND_TIME",
            ValueKind::List => "LIST",
            ValueKind::Struct => "STRUCT",
            ValueKind::RawBytes => "RAW_BYTES",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single value read from a PLC
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PlcValue {
    /// Explicit protocol null
    #[default]
    Null,
    Bool(bool),
    /// Untyped 8-bit bit string
    Byte(u8),
    Uint8(u8),
    Int8(i8),
    Int16(i16),
    Uint16(u16),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
    /// Time of day
    Time(NaiveTime),
    /// Signed time span
    Duration(chrono::Duration),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Array of values
    List(Vec<PlcValue>),
    /// Structured value keyed by member name
    Struct(BTreeMap<String, PlcValue>),
    /// Raw bytes without type information
    RawBytes(Vec<u8>),
}

impl PlcValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            PlcValue::Null => ValueKind::Null,
            PlcValue::Bool(_) => ValueKind::Bool,
            PlcValue::Byte(_) => ValueKind::Byte,
            PlcValue::Uint8(_) => ValueKind::Uint8,
            PlcValue::Int8(_) => ValueKind::Int8,
            PlcValue::Int16(_) => ValueKind::Int16,
            PlcValue::Uint16(_) => ValueKind::Uint16,
            PlcValue::Int32(_) => ValueKind::Int32,
            PlcValue::Uint32(_) => ValueKind::Uint32,
            PlcValue::Int64(_) => ValueKind::Int64,
            PlcValue::Uint64(_) => ValueKind::Uint64,
            PlcValue::Float32(_) => ValueKind::Float32,
            PlcValue::Float64(_) => ValueKind::Float64,
            PlcValue::String(_) => ValueKind::String,
            PlcValue::Time(_) => ValueKind::Time,
            PlcValue::Duration(_) => ValueKind::Duration,
            PlcValue::Date(_) => ValueKind::Date,
            PlcValue::DateTime(_) => ValueKind::DateTime,
            PlcValue::List(_) => ValueKind::List,
            PlcValue::Struct(_) => ValueKind::Struct,
            PlcValue::RawBytes(_) => ValueKind::RawBytes,
        }
    }

    /// Check if value is the explicit protocol null
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, PlcValue::Null)
    }
}

impl fmt::Display for PlcValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlcValue::Null => f.write_str("null"),
            PlcValue::Bool(v) => write!(f, "{v}"),
            PlcValue::Byte(v) => write!(f, "16#{v:02X}"),
            PlcValue::Uint8(v) => write!(f, "{v}"),
            PlcValue::Int8(v) => write!(f, "{v}"),
            PlcValue::Int16(v) => write!(f, "{v}"),
            PlcValue::Uint16(v) => write!(f, "{v}"),
            PlcValue::Int32(v) => write!(f, "{v}"),
            PlcValue::Uint32(v) => write!(f, "{v}"),
            PlcValue::Int64(v) => write!(f, "{v}"),
            PlcValue::Uint64(v) => write!(f, "{v}"),
            PlcValue::Float32(v) => write!(f, "{v}"),
            PlcValue::Float64(v) => write!(f, "{v}"),
            PlcValue::String(v) => write!(f, "{v:?}"),
            PlcValue::Time(v) => write!(f, "{v}"),
            PlcValue::Duration(v) => write!(f, "{v}"),
            PlcValue::Date(v) => write!(f, "{v}"),
            PlcValue::DateTime(v) => write!(f, "{v}"),
            PlcValue::List(items) => write!(f, "[{} items]", items.len()),
            PlcValue::Struct(members) => write!(f, "{{{} members}}", members.len()),
            PlcValue::RawBytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl From<bool> for PlcValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i16> for PlcValue {
    fn from(v: i16) -> Self {
        Self::Int16(v)
    }
}

impl From<i32> for PlcValue {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<f32> for PlcValue {
    fn from(v: f32) -> Self {
        Self::Float32(v)
    }
}

impl From<f64> for PlcValue {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<&str> for PlcValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for PlcValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

//! Value normalizer
//!
//! Maps a driver value onto the scalar kinds a metric field can hold. Every
//! integer kind keeps its own width and signedness. Null and composite values
//! produce no field.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use plc_link::PlcValue;
use serde::{Serialize, Serializer};

/// Normalized field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
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
    Duration(chrono::Duration),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

/// Duration as signed nanoseconds, saturating outside the i64 range
pub(crate) fn duration_nanos(d: &chrono::Duration) -> i64 {
    d.num_nanoseconds().unwrap_or(if *d < chrono::Duration::zero() {
        i64::MIN
    } else {
        i64::MAX
    })
}

pub(crate) const TIME_FORMAT: &str = "%H:%M:%S%.f";
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Bool(v) => serializer.serialize_bool(*v),
            FieldValue::Uint8(v) => serializer.serialize_u8(*v),
            FieldValue::Int8(v) => serializer.serialize_i8(*v),
            FieldValue::Int16(v) => serializer.serialize_i16(*v),
            FieldValue::Uint16(v) => serializer.serialize_u16(*v),
            FieldValue::Int32(v) => serializer.serialize_i32(*v),
            FieldValue::Uint32(v) => serializer.serialize_u32(*v),
            FieldValue::Int64(v) => serializer.serialize_i64(*v),
            FieldValue::Uint64(v) => serializer.serialize_u64(*v),
            FieldValue::Float32(v) => serializer.serialize_f32(*v),
            FieldValue::Float64(v) => serializer.serialize_f64(*v),
            FieldValue::String(v) => serializer.serialize_str(v),
            FieldValue::Time(v) => serializer.collect_str(&v.format(TIME_FORMAT)),
            FieldValue::Duration(v) => serializer.serialize_i64(duration_nanos(v)),
            FieldValue::Date(v) => serializer.collect_str(&v.format(DATE_FORMAT)),
            FieldValue::DateTime(v) => serializer.collect_str(&v.format(DATETIME_FORMAT)),
        }
    }
}

/// Normalize a driver value, `None` when it yields no field
pub fn normalize(value: &PlcValue) -> Option<FieldValue> {
    let normalized = match value {
        PlcValue::Null => return None,
        PlcValue::Bool(v) => FieldValue::Bool(*v),
        PlcValue::Byte(v) | PlcValue::Uint8(v) => FieldValue::Uint8(*v),
        PlcValue::Int8(v) => FieldValue::Int8(*v),
        PlcValue::Int16(v) => FieldValue::Int16(*v),
        PlcValue::Uint16(v) => FieldValue::Uint16(*v),
        PlcValue::Int32(v) => FieldValue::Int32(*v),
        PlcValue::Uint32(v) => FieldValue::Uint32(*v),
        PlcValue::Int64(v) => FieldValue::Int64(*v),
        PlcValue::Uint64(v) => FieldValue::Uint64(*v),
        PlcValue::Float32(v) => FieldValue::Float32(*v),
        PlcValue::Float64(v) => FieldValue::Float64(*v),
        PlcValue::String(v) => FieldValue::String(v.clone()),
        PlcValue::Time(v) => FieldValue::Time(*v),
        PlcValue::Duration(v) => FieldValue::Duration(*v),
        PlcValue::Date(v) => FieldValue::Date(*v),
        PlcValue::DateTime(v) => FieldValue::DateTime(*v),
        PlcValue::List(_) | PlcValue::Struct(_) | PlcValue::RawBytes(_) => return None,
    };
    Some(normalized)
}

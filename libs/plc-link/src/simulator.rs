//! Simulated PLC driver
//!
//! Serves values without touching any wire protocol, for demos and tests.
//!
//! # Address grammar
//!
//! An address is a `:`-separated string. The first segment naming an
//! IEC 61131-3 data type selects the value kind; everything after it is an
//! optional literal:
//!
//! ```text
//! REAL:21.5            fixed value
//! %DB1.DBD0:REAL       ramp derived from the read counter
//! STRING:line:1        literal may contain ':'
//! TOD:12:30:00         time of day
//! TIME:1500ms          duration
//! NULL                 explicit null
//! ERROR:REMOTE_BUSY    per-tag failure with the given response code
//! RAW:0A0B             raw bytes (hex)
//! ```
//!
//! Connection parameters: `latency-ms=<n>` delays every read.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{PlcError, Result};
use crate::manager::{protocol_code_of, query_parameters};
use crate::response::{ReadResponse, ResponseCode};
use crate::traits::{ConnectionMetadata, PlcConnection, PlcDriver, ReadRequest, ReadRequestBuilder};
use crate::value::{PlcValue, ValueKind};

/// Protocol code used when the simulator is registered under its own name
pub const SIMULATED_PROTOCOL: &str = "simulated";

/// Driver serving simulated values for any protocol code
#[derive(Debug, Clone)]
pub struct SimulatedDriver {
    code: String,
}

impl SimulatedDriver {
    /// Simulate the protocol identified by `code`
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new(SIMULATED_PROTOCOL)
    }
}

#[async_trait]
impl PlcDriver for SimulatedDriver {
    fn protocol_code(&self) -> &str {
        &self.code
    }

    fn protocol_name(&self) -> &str {
        "Simulated PLC"
    }

    async fn connect(&self, url: &str) -> Result<Box<dyn PlcConnection>> {
        let code = protocol_code_of(url)?;
        if code != self.code {
            return Err(PlcError::connection(format!(
                "driver '{}' cannot open '{}'",
                self.code, url
            )));
        }

        let mut latency = Duration::ZERO;
        for (key, value) in query_parameters(url) {
            if key == "latency-ms" {
                let ms = value.parse::<u64>().map_err(|e| {
                    PlcError::connection(format!("invalid latency-ms '{}': {}", value, e))
                })?;
                latency = Duration::from_millis(ms);
            }
        }

        debug!("Simulated connection opened: {}", url);
        Ok(Box::new(SimulatedConnection {
            url: url.to_string(),
            latency,
            state: Arc::new(SimState {
                connected: AtomicBool::new(true),
                reads: AtomicU64::new(0),
            }),
        }))
    }
}

#[derive(Debug)]
struct SimState {
    connected: AtomicBool,
    reads: AtomicU64,
}

/// Connection handed out by [`SimulatedDriver`]
#[derive(Debug)]
pub struct SimulatedConnection {
    url: String,
    latency: Duration,
    state: Arc<SimState>,
}

#[async_trait]
impl PlcConnection for SimulatedConnection {
    fn url(&self) -> &str {
        &self.url
    }

    fn metadata(&self) -> ConnectionMetadata {
        ConnectionMetadata::read_only()
    }

    fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Acquire)
    }

    fn read_request_builder(&self) -> Result<Box<dyn ReadRequestBuilder>> {
        if !self.is_connected() {
            return Err(PlcError::Closed);
        }
        Ok(Box::new(SimulatedRequestBuilder {
            state: Arc::clone(&self.state),
            latency: self.latency,
            tags: Vec::new(),
        }))
    }

    async fn close(&mut self) -> Result<()> {
        if self.state.connected.swap(false, Ordering::AcqRel) {
            debug!("Simulated connection closed: {}", self.url);
        }
        Ok(())
    }
}

struct SimulatedRequestBuilder {
    state: Arc<SimState>,
    latency: Duration,
    tags: Vec<(String, String)>,
}

impl ReadRequestBuilder for SimulatedRequestBuilder {
    fn add_tag_address(&mut self, name: &str, address: &str) {
        self.tags.push((name.to_string(), address.to_string()));
    }

    fn build(self: Box<Self>) -> Result<Box<dyn ReadRequest>> {
        let points = self
            .tags
            .into_iter()
            .map(|(name, address)| {
                let point = SimPoint::parse(&address)
                    .map_err(|reason| PlcError::invalid_address(&name, &address, reason))?;
                Ok((name, point))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Box::new(SimulatedRequest {
            state: self.state,
            latency: self.latency,
            points,
        }))
    }
}

struct SimulatedRequest {
    state: Arc<SimState>,
    latency: Duration,
    points: Vec<(String, SimPoint)>,
}

#[async_trait]
impl ReadRequest for SimulatedRequest {
    fn tag_names(&self) -> Vec<String> {
        self.points.iter().map(|(name, _)| name.clone()).collect()
    }

    async fn execute(&self, cancel: CancellationToken) -> Result<ReadResponse> {
        if !self.state.connected.load(Ordering::Acquire) {
            return Err(PlcError::Closed);
        }

        if !self.latency.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(PlcError::Cancelled),
                _ = tokio::time::sleep(self.latency) => {},
            }
        }

        let counter = self.state.reads.fetch_add(1, Ordering::AcqRel);
        let mut response = ReadResponse::new();
        for (name, point) in &self.points {
            let (code, value) = point.sample(counter);
            trace!("[sim] {} -> {} {}", name, code, value);
            response.insert(name.as_str(), code, value);
        }
        Ok(response)
    }
}

/// One simulated tag
#[derive(Debug, Clone, PartialEq)]
enum SimPoint {
    Fixed(PlcValue),
    Ramp(ValueKind),
    Fault(ResponseCode),
}

impl SimPoint {
    fn parse(address: &str) -> std::result::Result<Self, String> {
        let segments: Vec<&str> = address.split(':').collect();
        let (index, type_name) = segments
            .iter()
            .enumerate()
            .find(|(_, segment)| is_type_name(segment))
            .ok_or_else(|| "no data type in address".to_string())?;

        let literal = if index + 1 < segments.len() {
            Some(segments[index + 1..].join(":"))
        } else {
            None
        };
        let type_name = type_name.to_ascii_uppercase();

        if type_name == "ERROR" {
            let code = literal.ok_or_else(|| "ERROR requires a response code".to_string())?;
            return ResponseCode::parse(&code)
                .map(SimPoint::Fault)
                .ok_or_else(|| format!("unknown response code '{}'", code));
        }

        let kind = kind_of(&type_name).ok_or_else(|| format!("unknown type '{}'", type_name))?;
        match literal {
            Some(literal) => parse_literal(kind, &literal)
                .map(SimPoint::Fixed)
                .map_err(|e| format!("invalid {} literal '{}': {}", type_name, literal, e)),
            None if kind == ValueKind::RawBytes => Ok(SimPoint::Fixed(PlcValue::RawBytes(vec![]))),
            None => Ok(SimPoint::Ramp(kind)),
        }
    }

    fn sample(&self, n: u64) -> (ResponseCode, PlcValue) {
        match self {
            SimPoint::Fixed(value) => (ResponseCode::Ok, value.clone()),
            SimPoint::Fault(code) => (*code, PlcValue::Null),
            SimPoint::Ramp(kind) => (ResponseCode::Ok, ramp(*kind, n)),
        }
    }
}

fn is_type_name(segment: &str) -> bool {
    let upper = segment.to_ascii_uppercase();
    upper == "ERROR" || kind_of(&upper).is_some()
}

fn kind_of(type_name: &str) -> Option<ValueKind> {
    let kind = match type_name {
        "NULL" => ValueKind::Null,
        "BOOL" => ValueKind::Bool,
        "BYTE" => ValueKind::Byte,
        "USINT" => ValueKind::Uint8,
        "SINT" => ValueKind::Int8,
        "INT" => ValueKind::Int16,
        "UINT" | "WORD" => ValueKind::Uint16,
        "DINT" => ValueKind::Int32,
        "UDINT" | "DWORD" => ValueKind::Uint32,
        "LINT" => ValueKind::Int64,
        "ULINT" | "LWORD" => ValueKind::Uint64,
        "REAL" => ValueKind::Float32,
        "LREAL" => ValueKind::Float64,
        "STRING" => ValueKind::String,
        "TOD" | "TIME_OF_DAY" => ValueKind::Time,
        "TIME" => ValueKind::Duration,
        "DATE" => ValueKind::Date,
        "DT" | "DATE_AND_TIME" => ValueKind::DateTime,
        "RAW" => ValueKind::RawBytes,
        _ => return None,
    };
    Some(kind)
}

fn parse_literal(kind: ValueKind, literal: &str) -> std::result::Result<PlcValue, String> {
    fn num<T: std::str::FromStr>(s: &str) -> std::result::Result<T, String>
    where
        T::Err: std::fmt::Display,
    {
        s.trim().parse::<T>().map_err(|e| e.to_string())
    }

    let value = match kind {
        ValueKind::Null => PlcValue::Null,
        ValueKind::Bool => match literal.to_ascii_lowercase().as_str() {
            "true" | "1" => PlcValue::Bool(true),
            "false" | "0" => PlcValue::Bool(false),
            other => return Err(format!("expected true/false, got '{}'", other)),
        },
        ValueKind::Byte => {
            let hex = literal
                .strip_prefix("16#")
                .or_else(|| literal.strip_prefix("0x"));
            match hex {
                Some(hex) => PlcValue::Byte(u8::from_str_radix(hex, 16).map_err(|e| e.to_string())?),
                None => PlcValue::Byte(num(literal)?),
            }
        },
        ValueKind::Uint8 => PlcValue::Uint8(num(literal)?),
        ValueKind::Int8 => PlcValue::Int8(num(literal)?),
        ValueKind::Int16 => PlcValue::Int16(num(literal)?),
        ValueKind::Uint16 => PlcValue::Uint16(num(literal)?),
        ValueKind::Int32 => PlcValue::Int32(num(literal)?),
        ValueKind::Uint32 => PlcValue::Uint32(num(literal)?),
        ValueKind::Int64 => PlcValue::Int64(num(literal)?),
        ValueKind::Uint64 => PlcValue::Uint64(num(literal)?),
        ValueKind::Float32 => PlcValue::Float32(num(literal)?),
        ValueKind::Float64 => PlcValue::Float64(num(literal)?),
        ValueKind::String => PlcValue::String(literal.to_string()),
        ValueKind::Time => PlcValue::Time(
            NaiveTime::parse_from_str(literal, "%H:%M:%S%.f").map_err(|e| e.to_string())?,
        ),
        ValueKind::Duration => PlcValue::Duration(parse_duration(literal)?),
        ValueKind::Date => PlcValue::Date(
            NaiveDate::parse_from_str(literal, "%Y-%m-%d").map_err(|e| e.to_string())?,
        ),
        ValueKind::DateTime => PlcValue::DateTime(
            NaiveDateTime::parse_from_str(literal, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(literal, "%Y-%m-%d %H:%M:%S%.f"))
                .map_err(|e| e.to_string())?,
        ),
        ValueKind::RawBytes => PlcValue::RawBytes(parse_hex(literal)?),
        ValueKind::List | ValueKind::Struct => {
            return Err("composite values cannot be simulated".to_string())
        },
    };
    Ok(value)
}

/// Parse `1500ms`, `2s`, `5m`, `1h` or a bare millisecond count, optionally negative
fn parse_duration(literal: &str) -> std::result::Result<chrono::Duration, String> {
    let literal = literal.trim();
    let (negative, body) = match literal.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, literal),
    };
    let split = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    let (digits, unit) = body.split_at(split);
    let amount: i64 = digits.parse().map_err(|_| "missing amount".to_string())?;
    let duration = match unit {
        "" | "ms" => chrono::Duration::milliseconds(amount),
        "s" => chrono::Duration::seconds(amount),
        "m" => chrono::Duration::minutes(amount),
        "h" => chrono::Duration::hours(amount),
        other => return Err(format!("unknown unit '{}'", other)),
    };
    Ok(if negative { -duration } else { duration })
}

fn parse_hex(literal: &str) -> std::result::Result<Vec<u8>, String> {
    if !literal.is_ascii() {
        return Err("hex digits must be ASCII".to_string());
    }
    if literal.len() % 2 != 0 {
        return Err("odd number of hex digits".to_string());
    }
    literal
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let digits = std::str::from_utf8(pair).map_err(|e| e.to_string())?;
            u8::from_str_radix(digits, 16).map_err(|e| e.to_string())
        })
        .collect()
}

/// Deterministic value for the n-th read
fn ramp(kind: ValueKind, n: u64) -> PlcValue {
    match kind {
        ValueKind::Null => PlcValue::Null,
        ValueKind::Bool => PlcValue::Bool(n % 2 == 1),
        ValueKind::Byte => PlcValue::Byte(n as u8),
        ValueKind::Uint8 => PlcValue::Uint8(n as u8),
        ValueKind::Int8 => PlcValue::Int8(n as u8 as i8),
        ValueKind::Int16 => PlcValue::Int16(n as u16 as i16),
        ValueKind::Uint16 => PlcValue::Uint16(n as u16),
        ValueKind::Int32 => PlcValue::Int32(n as u32 as i32),
        ValueKind::Uint32 => PlcValue::Uint32(n as u32),
        ValueKind::Int64 => PlcValue::Int64(n as i64),
        ValueKind::Uint64 => PlcValue::Uint64(n),
        ValueKind::Float32 => PlcValue::Float32(n as f32 * 0.5),
        ValueKind::Float64 => PlcValue::Float64(n as f64 * 0.25),
        ValueKind::String => PlcValue::String(format!("value-{}", n)),
        ValueKind::Time => NaiveTime::from_num_seconds_from_midnight_opt((n % 86_400) as u32, 0)
            .map_or(PlcValue::Null, PlcValue::Time),
        ValueKind::Duration => PlcValue::Duration(chrono::Duration::milliseconds(n as i64 * 100)),
        ValueKind::Date => NaiveDate::from_ymd_opt(2000, 1, 1)
            .and_then(|d| d.checked_add_days(chrono::Days::new(n % 36_500)))
            .map_or(PlcValue::Null, PlcValue::Date),
        ValueKind::DateTime => NaiveDate::from_ymd_opt(2000, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt + chrono::Duration::seconds((n % 3_153_600_000) as i64))
            .map_or(PlcValue::Null, PlcValue::DateTime),
        ValueKind::RawBytes => PlcValue::RawBytes(n.to_be_bytes().to_vec()),
        ValueKind::List => PlcValue::List(Vec::new()),
        ValueKind::Struct => PlcValue::Struct(Default::default()),
    }
}

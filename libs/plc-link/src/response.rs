//! Per-tag response codes and batched read responses

use std::collections::HashMap;
use std::fmt;

use crate::value::PlcValue;

/// Status of a single tag within a batched read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    Ok,
    NotFound,
    AccessDenied,
    InvalidAddress,
    InvalidDatatype,
    InvalidData,
    InternalError,
    RemoteBusy,
    RemoteError,
    Unsupported,
    ResponsePending,
}

impl ResponseCode {
    pub fn is_ok(&self) -> bool {
        matches!(self, ResponseCode::Ok)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseCode::Ok => "OK",
            ResponseCode::NotFound => "NOT_FOUND",
            ResponseCode::AccessDenied => "ACCESS_DENIED",
            ResponseCode::InvalidAddress => "INVALID_ADDRESS",
            ResponseCode::InvalidDatatype => "INVALID_DATATYPE",
            ResponseCode::InvalidData => "INVALID_DATA",
            ResponseCode::InternalError => "INTERNAL_ERROR",
            ResponseCode::RemoteBusy => "REMOTE_BUSY",
            ResponseCode::RemoteError => "REMOTE_ERROR",
            ResponseCode::Unsupported => "UNSUPPORTED",
            ResponseCode::ResponsePending => "RESPONSE_PENDING",
        }
    }

    /// Parse the SCREAMING_SNAKE name (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        let code = match name.to_ascii_uppercase().as_str() {
            "OK" => ResponseCode::Ok,
            "NOT_FOUND" => ResponseCode::NotFound,
            "ACCESS_DENIED" => ResponseCode::AccessDenied,
            "INVALID_ADDRESS" => ResponseCode::InvalidAddress,
            "INVALID_DATATYPE" => ResponseCode::InvalidDatatype,
            "INVALID_DATA" => ResponseCode::InvalidData,
            "INTERNAL_ERROR" => ResponseCode::InternalError,
            "REMOTE_BUSY" => ResponseCode::RemoteBusy,
            "REMOTE_ERROR" => ResponseCode::RemoteError,
            "UNSUPPORTED" => ResponseCode::Unsupported,
            "RESPONSE_PENDING" => ResponseCode::ResponsePending,
            _ => return None,
        };
        Some(code)
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one batched read
///
/// Tags missing from the response report [`ResponseCode::NotFound`] and a
/// null value.
#[derive(Debug, Clone, Default)]
pub struct ReadResponse {
    entries: HashMap<String, (ResponseCode, PlcValue)>,
}

impl ReadResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome for one tag, replacing any previous entry
    pub fn insert(&mut self, tag: impl Into<String>, code: ResponseCode, value: PlcValue) {
        self.entries.insert(tag.into(), (code, value));
    }

    #[must_use]
    pub fn with(mut self, tag: impl Into<String>, code: ResponseCode, value: PlcValue) -> Self {
        self.insert(tag, code, value);
        self
    }

    pub fn response_code(&self, tag: &str) -> ResponseCode {
        self.entries
            .get(tag)
            .map_or(ResponseCode::NotFound, |(code, _)| *code)
    }

    pub fn value(&self, tag: &str) -> &PlcValue {
        static NULL: PlcValue = PlcValue::Null;
        self.entries.get(tag).map_or(&NULL, |(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

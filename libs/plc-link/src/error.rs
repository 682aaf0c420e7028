//! PLC Link Error Types
//!
//! Core error types shared by drivers, connections and read requests.

use thiserror::Error;

/// Result type for plc-link operations
pub type Result<T> = std::result::Result<T, PlcError>;

/// PLC link errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlcError {
    /// Connection string could not be parsed
    #[error("Invalid connection url '{0}'")]
    InvalidUrl(String),

    /// No driver registered for the protocol code
    #[error("No driver registered for protocol '{0}'")]
    NoDriver(String),

    /// Connection establishment or maintenance errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// The connection does not offer the requested capability
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// A tag address could not be resolved by the driver
    #[error("Invalid address '{address}' for tag '{tag}': {reason}")]
    InvalidAddress {
        tag: String,
        address: String,
        reason: String,
    },

    /// Request could not be finalized
    #[error("Build error: {0}")]
    Build(String),

    /// Transport-level failure while executing a request
    #[error("Execution error: {0}")]
    Execution(String),

    /// Execution was cancelled by the caller
    #[error("Request cancelled")]
    Cancelled,

    /// The connection was closed
    #[error("Connection closed")]
    Closed,
}

impl PlcError {
    pub fn connection(msg: impl Into<String>) -> Self {
        PlcError::Connection(msg.into())
    }

    pub fn build(msg: impl Into<String>) -> Self {
        PlcError::Build(msg.into())
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        PlcError::Execution(msg.into())
    }

    pub fn invalid_address(
        tag: impl Into<String>,
        address: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        PlcError::InvalidAddress {
            tag: tag.into(),
            address: address.into(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for PlcError {
    fn from(err: std::io::Error) -> Self {
        PlcError::Connection(err.to_string())
    }
}

//! plcsrv error types
//!
//! Configuration problems are fatal at startup. Connection problems are fatal
//! at startup and bounded by a single reconnect-and-retry while cycling.
//! Timeouts only cost the current cycle.

use std::time::Duration;

use thiserror::Error;

/// Result type for plcsrv operations
pub type Result<T> = std::result::Result<T, PlcSrvError>;

/// Configuration errors, raised while loading or initializing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing 'schema' in plc configuration")]
    MissingSchema,

    #[error("Missing 'domain_name' in plc configuration")]
    MissingDomainName,

    #[error("No metric blocks configured")]
    NoMetrics,

    #[error("Unsupported schema '{0}'")]
    UnsupportedSchema(String),

    #[error("Metric '{metric}' has no fields")]
    MissingMeasurementFields { metric: String },

    #[error("Metric '{metric}' contains a field without a name")]
    UnnamedField { metric: String },

    #[error("Field name '{field}' is used more than once")]
    DuplicateField { field: String },

    #[error("No fields configured")]
    NoFieldsAtAll,

    #[error("Failed to load configuration: {0}")]
    Load(String),
}

/// Connection lifecycle errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Failed to connect to '{url}': {reason}")]
    ConnectFailed { url: String, reason: String },

    #[error("Connection '{url}' does not support reading")]
    Unsupported { url: String },

    #[error("Failed to build read request: {0}")]
    BuildFailed(String),

    #[error("Read request failed: {0}")]
    ExecuteFailed(String),

    #[error("No active connection")]
    NotConnected,

    #[error("Session is shut down")]
    Closed,
}

/// Top-level service error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlcSrvError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Read request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Output error: {0}")]
    Output(String),
}

impl PlcSrvError {
    /// Errors that must stop the poll loop
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PlcSrvError::Config(_) | PlcSrvError::Connection(ConnectionError::Closed)
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PlcSrvError::Timeout(_))
    }
}

impl From<std::io::Error> for PlcSrvError {
    fn from(err: std::io::Error) -> Self {
        PlcSrvError::Output(err.to_string())
    }
}

impl From<serde_json::Error> for PlcSrvError {
    fn from(err: serde_json::Error) -> Self {
        PlcSrvError::Output(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(PlcSrvError::from(ConfigError::NoMetrics).is_fatal());
        assert!(PlcSrvError::from(ConnectionError::Closed).is_fatal());
        assert!(!PlcSrvError::Timeout(Duration::from_secs(1)).is_fatal());
        assert!(!PlcSrvError::from(ConnectionError::ExecuteFailed("reset".into())).is_fatal());
        assert!(!PlcSrvError::Output("broken pipe".into()).is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let err = ConfigError::DuplicateField {
            field: "temp".into(),
        };
        assert_eq!(err.to_string(), "Field name 'temp' is used more than once");

        let err: PlcSrvError = ConnectionError::BuildFailed("bad address".into()).into();
        assert_eq!(err.to_string(), "Failed to build read request: bad address");
    }
}

//! Core PLC Link Traits
//!
//! Drivers open connections, connections hand out read request builders, and
//! a finished request is executed once per poll cycle. All protocol
//! implementations live behind these traits.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::response::ReadResponse;

/// Capabilities advertised by an open connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionMetadata {
    pub can_read: bool,
    pub can_write: bool,
    pub can_subscribe: bool,
}

impl ConnectionMetadata {
    pub fn read_only() -> Self {
        Self {
            can_read: true,
            ..Self::default()
        }
    }
}

/// Protocol driver - opens connections for one protocol code
///
/// @trait PlcDriver
/// @implementors SimulatedDriver, external protocol drivers
/// @lifecycle registered once in a DriverManager, shared by all connections
#[async_trait]
pub trait PlcDriver: Send + Sync {
    /// Protocol code matched against the url scheme (e.g. "s7", "modbus-tcp")
    fn protocol_code(&self) -> &str;

    /// Human readable driver name
    fn protocol_name(&self) -> &str {
        self.protocol_code()
    }

    /// Open a connection to the endpoint described by `url`
    async fn connect(&self, url: &str) -> Result<Box<dyn PlcConnection>>;
}

/// An open connection to a single PLC
#[async_trait]
pub trait PlcConnection: Send + Sync {
    /// Connection string this connection was opened with
    fn url(&self) -> &str;

    fn metadata(&self) -> ConnectionMetadata;

    fn is_connected(&self) -> bool;

    /// Create a builder for a batched read request bound to this connection
    fn read_request_builder(&self) -> Result<Box<dyn ReadRequestBuilder>>;

    /// Release the connection; calling it twice is not an error
    async fn close(&mut self) -> Result<()>;
}

/// Collects (tag name, address) pairs into one batched request
pub trait ReadRequestBuilder: Send {
    fn add_tag_address(&mut self, name: &str, address: &str);

    /// Resolve every registered address and finalize the request
    fn build(self: Box<Self>) -> Result<Box<dyn ReadRequest>>;
}

/// A finalized batched read request
#[async_trait]
pub trait ReadRequest: Send + Sync {
    /// Tag names in registration order
    fn tag_names(&self) -> Vec<String>;

    /// Execute the request once
    ///
    /// `cancel` fires when the caller gives up, just before the future is
    /// dropped. Work the driver spawned outside this future (transport
    /// tasks, pending transactions) must watch the token and stop.
    async fn execute(&self, cancel: CancellationToken) -> Result<ReadResponse>;
}

//! Read-cycle session
//!
//! Owns the connection and the prebuilt read request for one poll target and
//! drives a cycle end to end: execute with a deadline, reconnect and retry
//! once on transport errors, normalize and group the results.
//!
//! ```text
//!  Disconnected ──connect()──► Connected ──build_request()──► Ready ──execute_cycle()──┐
//!       ▲                                                        ▲                    │
//!       └──────────── timeout / failed retry (teardown) ─────────┴────────────────────┘
//!  any state ──shutdown()──► Terminal
//! ```

use chrono::{DateTime, Utc};
use plc_link::{DriverManager, PlcConnection, ReadRequest, ReadResponse};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PollTarget;
use crate::error::{ConnectionError, PlcSrvError, Result};
use crate::grouper::{Metric, SeriesGrouper};
use crate::normalize::normalize;
use crate::request::build_read_request;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Ready,
    Terminal,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connected => "connected",
            SessionState::Ready => "ready",
            SessionState::Terminal => "terminal",
        };
        f.write_str(name)
    }
}

pub struct Session {
    manager: DriverManager,
    target: PollTarget,
    connection: Option<Box<dyn PlcConnection>>,
    request: Option<Box<dyn ReadRequest>>,
    grouper: SeriesGrouper,
    state: SessionState,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("url", &self.target.url)
            .field("fields", &self.target.fields.len())
            .field("state", &self.state)
            .finish()
    }
}

impl Session {
    pub fn new(manager: DriverManager, target: PollTarget) -> Self {
        Self {
            manager,
            target,
            connection: None,
            request: None,
            grouper: SeriesGrouper::new(),
            state: SessionState::Disconnected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn target(&self) -> &PollTarget {
        &self.target
    }

    /// Open the connection; a no-op when one is already open
    pub async fn connect(&mut self) -> std::result::Result<(), ConnectionError> {
        match self.state {
            SessionState::Terminal => return Err(ConnectionError::Closed),
            SessionState::Connected | SessionState::Ready => return Ok(()),
            SessionState::Disconnected => {},
        }

        let url = self.target.url.clone();
        debug!("Connecting to {}", url);
        let connection =
            self.manager
                .get_connection(&url)
                .await
                .map_err(|e| ConnectionError::ConnectFailed {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;

        self.connection = Some(connection);
        self.state = SessionState::Connected;
        info!("Connected to {}", url);
        Ok(())
    }

    /// Build the batched read request on the open connection
    pub fn build_request(&mut self) -> std::result::Result<(), ConnectionError> {
        if self.state == SessionState::Terminal {
            return Err(ConnectionError::Closed);
        }
        let connection = self
            .connection
            .as_deref()
            .ok_or(ConnectionError::NotConnected)?;

        let request = build_read_request(connection, &self.target.fields)?;
        debug!("Read request ready with {} tags", self.target.fields.len());
        self.request = Some(request);
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Connect (if needed) and build the request
    pub async fn establish(&mut self) -> std::result::Result<(), ConnectionError> {
        self.connect().await?;
        self.build_request()
    }

    /// Run one cycle and return its metrics
    ///
    /// Connecting, rebuilding and reading are each bounded by the target
    /// timeout. A timeout tears the connection down and yields
    /// [`PlcSrvError::Timeout`]; the next cycle re-establishes it before reading.
    pub async fn execute_cycle(&mut self) -> Result<Vec<Metric>> {
        if self.state == SessionState::Terminal {
            return Err(ConnectionError::Closed.into());
        }

        let timestamp = Utc::now();

        if self.state != SessionState::Ready {
            self.establish_before_deadline().await?;
        }

        let response = match self.execute_once().await {
            Ok(response) => response,
            Err(PlcSrvError::Connection(err)) => {
                warn!("Read failed ({}), reconnecting", err);
                self.teardown().await;
                self.establish_before_deadline().await?;
                info!("Reconnected to {}, retrying read", self.target.url);

                match self.execute_once().await {
                    Ok(response) => response,
                    Err(err) => {
                        if !err.is_timeout() {
                            self.teardown().await;
                        }
                        return Err(err);
                    },
                }
            },
            Err(err) => return Err(err),
        };

        Ok(self.collect(&response, timestamp))
    }

    /// Release the connection and refuse further cycles
    pub async fn shutdown(&mut self) {
        if self.state == SessionState::Terminal {
            return;
        }
        self.teardown().await;
        self.state = SessionState::Terminal;
        info!("Session for {} shut down", self.target.url);
    }

    async fn establish_before_deadline(&mut self) -> Result<()> {
        let timeout = self.target.timeout;

        let outcome = tokio::select! {
            result = self.establish() => Some(result),
            _ = tokio::time::sleep(timeout) => None,
        };

        match outcome {
            Some(result) => Ok(result?),
            None => {
                warn!("Connecting to {} timed out after {:?}", self.target.url, timeout);
                self.teardown().await;
                Err(PlcSrvError::Timeout(timeout))
            },
        }
    }

    async fn execute_once(&mut self) -> Result<ReadResponse> {
        let request = self.request.as_ref().ok_or(ConnectionError::NotConnected)?;
        let timeout = self.target.timeout;
        let cancel = CancellationToken::new();

        // the token fires while the read is still alive, before select drops it
        let deadline = async {
            tokio::time::sleep(timeout).await;
            cancel.cancel();
        };

        let outcome = tokio::select! {
            result = request.execute(cancel.clone()) => Some(result),
            _ = deadline => None,
        };

        match outcome {
            Some(Ok(response)) => Ok(response),
            Some(Err(e)) => Err(ConnectionError::ExecuteFailed(e.to_string()).into()),
            None => {
                warn!("Read from {} timed out after {:?}", self.target.url, timeout);
                self.teardown().await;
                Err(PlcSrvError::Timeout(timeout))
            },
        }
    }

    fn collect(&mut self, response: &ReadResponse, timestamp: DateTime<Utc>) -> Vec<Metric> {
        for field in &self.target.fields {
            let code = response.response_code(&field.name);
            if !code.is_ok() {
                debug!("Skipping field '{}': {}", field.name, code);
                continue;
            }

            let raw = response.value(&field.name);
            let Some(value) = normalize(raw) else {
                debug!("Skipping field '{}': no value for kind {}", field.name, raw.kind());
                continue;
            };

            self.grouper.add(
                &field.mapping.measurement,
                &field.mapping.tags,
                timestamp,
                &field.mapping.field,
                value,
            );
        }

        self.grouper.drain()
    }

    async fn teardown(&mut self) {
        self.request = None;
        if let Some(mut connection) = self.connection.take() {
            if let Err(e) = connection.close().await {
                warn!("Error closing {}: {}", self.target.url, e);
            }
        }
        if self.state != SessionState::Terminal {
            self.state = SessionState::Disconnected;
        }
    }
}

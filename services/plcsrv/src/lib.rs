//! PLC polling service
//!
//! Reads a configured set of tags from a controller once per interval,
//! normalizes each value and groups the results into metrics:
//!
//! ```text
//! config ──► mapping (field table) ──► request (batched read)
//!                                          │
//! poller ──tick──► session.execute_cycle() ┘──► normalize ──► grouper ──► sink
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod grouper;
pub mod mapping;
pub mod normalize;
pub mod poller;
pub mod request;
pub mod session;
pub mod sink;

pub use config::{AppConfig, PlcConfig, PollTarget, Schema, ServiceConfig};
pub use error::{ConfigError, ConnectionError, PlcSrvError, Result};
pub use grouper::{Metric, SeriesGrouper};
pub use mapping::{build_fields, FieldMapping, MetricField, DEFAULT_MEASUREMENT};
pub use normalize::{normalize, FieldValue};
pub use poller::Poller;
pub use session::{Session, SessionState};
pub use sink::{JsonSink, LineProtocolSink, MetricSink, OutputFormat};

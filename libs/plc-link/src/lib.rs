//! PLC Link Library
//!
//! Vendor-agnostic access to programmable logic controllers.
//!
//! # Architecture
//!
//! This library provides:
//! - **Value model**: `PlcValue`, a single-kind tagged union for everything a driver can return
//! - **Responses**: per-tag `ResponseCode` and the batched `ReadResponse`
//! - **Core Traits**: `PlcDriver`, `PlcConnection`, `ReadRequestBuilder`, `ReadRequest`
//! - **Driver registry**: `DriverManager`, dispatching `<protocol>://...` urls
//! - **Simulated driver**: values without hardware, for demos and tests
//!
//! ```text
//! DriverManager ──get_connection(url)──► PlcConnection
//!                                          │ read_request_builder()
//!                                          ▼
//!                     ReadRequestBuilder ──build()──► ReadRequest ──execute()──► ReadResponse
//! ```

pub mod error;
pub mod manager;
pub mod response;
pub mod simulator;
pub mod traits;
pub mod value;

pub use error::{PlcError, Result};
pub use manager::{protocol_code_of, query_parameters, DriverManager};
pub use response::{ReadResponse, ResponseCode};
pub use simulator::{SimulatedDriver, SIMULATED_PROTOCOL};
pub use traits::{ConnectionMetadata, PlcConnection, PlcDriver, ReadRequest, ReadRequestBuilder};
pub use value::{PlcValue, ValueKind};

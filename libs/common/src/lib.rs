//! Shared plumbing for plcsrv services
//!
//! - `logging`: console + optional rolling file logging on top of `tracing`
//! - `shutdown`: Ctrl+C / SIGTERM handling wired to a `CancellationToken`

pub mod logging;
pub mod shutdown;

pub use logging::{init_with_config, LogConfig};
pub use shutdown::{cancel_on_shutdown, wait_for_shutdown};

//! Service bootstrap
//!
//! Command-line arguments plus the pieces `main` assembles before polling:
//! logging configuration and the driver registry.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use common::LogConfig;
use plc_link::{DriverManager, SimulatedDriver};
use tracing::info;

use crate::config::{Schema, ServiceConfig, DEFAULT_CONFIG_PATH};

/// Command-line arguments for plcsrv
#[derive(Parser, Debug, Clone)]
#[command(
    name = "plcsrv",
    version = env!("CARGO_PKG_VERSION"),
    about = "PLC polling service",
    long_about = None
)]
pub struct Args {
    /// Configuration file (yaml, toml or json)
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error), overrides `service.log_level`
    #[arg(short = 'l', long)]
    pub log_level: Option<String>,

    /// Run a single cycle, print its metrics and exit
    #[arg(long)]
    pub once: bool,

    /// Validation mode - only validate configuration without polling
    #[arg(long)]
    pub validate: bool,

    /// Serve the configured schema from the simulated driver
    #[arg(long)]
    pub simulate: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// Logging settings from the command line and the `service` section
pub fn log_config(args: &Args, service: &ServiceConfig) -> LogConfig {
    LogConfig {
        service_name: service.name.clone(),
        log_dir: service.log_dir.clone(),
        level: args
            .log_level
            .clone()
            .unwrap_or_else(|| service.log_level.clone()),
        enable_json: service.log_json,
        ansi: !args.no_color,
    }
}

/// Driver registry for `schema`
///
/// The `simulated` schema is always available. With `simulate` the simulated
/// driver also answers for the configured schema.
pub fn driver_manager(schema: Schema, simulate: bool) -> DriverManager {
    let mut manager = DriverManager::new();
    manager.register(Arc::new(SimulatedDriver::default()));

    if simulate && schema != Schema::Simulated {
        info!("Simulating protocol '{}'", schema);
        manager.register(Arc::new(SimulatedDriver::new(schema.as_str())));
    }

    manager
}

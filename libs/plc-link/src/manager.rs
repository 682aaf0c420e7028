//! Driver registry
//!
//! Maps protocol codes to drivers and dispatches connection strings of the
//! form `<code>://<address>[?params]` to the matching driver.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{PlcError, Result};
use crate::traits::{PlcConnection, PlcDriver};

/// Registry of protocol drivers
#[derive(Default, Clone)]
pub struct DriverManager {
    drivers: HashMap<String, Arc<dyn PlcDriver>>,
}

impl DriverManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver under its protocol code, replacing any previous one
    pub fn register(&mut self, driver: Arc<dyn PlcDriver>) {
        let code = driver.protocol_code().to_string();
        debug!("Registering driver '{}' for '{}'", driver.protocol_name(), code);
        self.drivers.insert(code, driver);
    }

    pub fn is_registered(&self, protocol_code: &str) -> bool {
        self.drivers.contains_key(protocol_code)
    }

    pub fn protocol_codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }

    /// Open a connection using the driver selected by the url scheme
    pub async fn get_connection(&self, url: &str) -> Result<Box<dyn PlcConnection>> {
        let code = protocol_code_of(url)?;
        let driver = self
            .drivers
            .get(code)
            .ok_or_else(|| PlcError::NoDriver(code.to_string()))?;
        driver.connect(url).await
    }
}

impl std::fmt::Debug for DriverManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverManager")
            .field("drivers", &self.protocol_codes())
            .finish()
    }
}

/// Extract the protocol code (url scheme) from a connection string
pub fn protocol_code_of(url: &str) -> Result<&str> {
    match url.split_once("://") {
        Some((code, rest)) if !code.is_empty() && !rest.is_empty() => Ok(code),
        _ => Err(PlcError::InvalidUrl(url.to_string())),
    }
}

/// Split the query part of a connection string into ordered key/value pairs
pub fn query_parameters(url: &str) -> Vec<(&str, &str)> {
    let Some((_, query)) = url.split_once('?') else {
        return Vec::new();
    };
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .collect()
}

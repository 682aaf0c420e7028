//! plcsrv configuration
//!
//! Loaded with figment from a YAML, TOML or JSON file (chosen by extension)
//! merged with `PLCSRV_` environment variables, e.g.
//! `PLCSRV_SERVICE__INTERVAL=5s` or `PLCSRV_PLC__DOMAIN_NAME=10.0.0.7`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Json, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mapping::{build_fields, MetricConfig, MetricField};
use crate::sink::OutputFormat;

pub const DEFAULT_CONFIG_PATH: &str = "config/plcsrv.yaml";
pub const ENV_PREFIX: &str = "PLCSRV_";

/// Supported connection schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schema {
    Ads,
    BacnetIp,
    CBus,
    Eip,
    KnxnetIp,
    ModbusTcp,
    Opcua,
    S7,
    Simulated,
}

impl Schema {
    pub const ALL: [Schema; 9] = [
        Schema::Ads,
        Schema::BacnetIp,
        Schema::CBus,
        Schema::Eip,
        Schema::KnxnetIp,
        Schema::ModbusTcp,
        Schema::Opcua,
        Schema::S7,
        Schema::Simulated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Schema::Ads => "ads",
            Schema::BacnetIp => "bacnet-ip",
            Schema::CBus => "c-bus",
            Schema::Eip => "eip",
            Schema::KnxnetIp => "knxnet-ip",
            Schema::ModbusTcp => "modbus-tcp",
            Schema::Opcua => "opcua",
            Schema::S7 => "s7",
            Schema::Simulated => "simulated",
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Schema {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Schema::ALL
            .into_iter()
            .find(|schema| schema.as_str() == s)
            .ok_or_else(|| ConfigError::UnsupportedSchema(s.to_string()))
    }
}

/// Connection parameter value; YAML numbers and booleans are accepted as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Text(v) => f.write_str(v),
        }
    }
}

/// `service` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default = "default_duration", with = "humantime_serde")]
    pub interval: Duration,
    #[serde(default)]
    pub output: OutputFormat,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Write the log file as JSON lines
    #[serde(default)]
    pub log_json: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            interval: default_duration(),
            output: OutputFormat::default(),
            log_dir: None,
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

fn default_service_name() -> String {
    "plcsrv".to_string()
}

fn default_duration() -> Duration {
    Duration::from_secs(10)
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `plc` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlcConfig {
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub domain_name: String,
    /// Ordered list of key/value maps appended to the connection url
    #[serde(default)]
    pub parameters: Vec<BTreeMap<String, ParamValue>>,
    #[serde(default = "default_duration", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default)]
    pub metric: Vec<MetricConfig>,
}

impl Default for PlcConfig {
    fn default() -> Self {
        Self {
            schema: String::new(),
            domain_name: String::new(),
            parameters: Vec::new(),
            timeout: default_duration(),
            metric: Vec::new(),
        }
    }
}

/// Everything a session needs, resolved from [`PlcConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTarget {
    pub schema: Schema,
    pub url: String,
    pub timeout: Duration,
    pub fields: Vec<MetricField>,
}

impl PlcConfig {
    /// Parameters flattened in declaration order; keys of one map come sorted
    pub fn parameter_pairs(&self) -> Vec<(String, String)> {
        self.parameters
            .iter()
            .flat_map(|map| map.iter().map(|(k, v)| (k.clone(), v.to_string())))
            .collect()
    }

    /// Validate the section and resolve it into a [`PollTarget`]
    pub fn init(&self) -> Result<PollTarget, ConfigError> {
        let schema = self.schema.trim();
        if schema.is_empty() {
            return Err(ConfigError::MissingSchema);
        }
        let domain_name = self.domain_name.trim();
        if domain_name.is_empty() {
            return Err(ConfigError::MissingDomainName);
        }
        if self.metric.is_empty() {
            return Err(ConfigError::NoMetrics);
        }
        let schema: Schema = schema.parse()?;
        let fields = build_fields(&self.metric)?;
        let url = connection_url(schema, domain_name, &self.parameter_pairs());

        Ok(PollTarget {
            schema,
            url,
            timeout: self.timeout,
            fields,
        })
    }
}

/// `<schema>://<domain>[?k1=v1&k2=v2...]`, parameters written verbatim
pub fn connection_url(schema: Schema, domain_name: &str, parameters: &[(String, String)]) -> String {
    let mut url = format!("{}://{}", schema, domain_name);
    for (i, (key, value)) in parameters.iter().enumerate() {
        url.push(if i == 0 { '?' } else { '&' });
        url.push_str(key);
        url.push('=');
        url.push_str(value);
    }
    url
}

/// Complete configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub plc: PlcConfig,
}

impl AppConfig {
    /// Load from `path` and merge `PLCSRV_` environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let figment = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Figment::new().merge(Toml::file(path)),
            Some("json") => Figment::new().merge(Json::file(path)),
            _ => Figment::new().merge(Yaml::file(path)),
        };

        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))
    }
}

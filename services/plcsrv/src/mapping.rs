//! Field mapping table
//!
//! Flattens the configured metric blocks into one list of readable fields.
//! Each field knows which measurement, field name and tag set its value ends
//! up in. The table is built once and shared read-only by every cycle.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Measurement name used when a metric block leaves `name` empty
pub const DEFAULT_MEASUREMENT: &str = "plc4x";

/// One `fields` entry of a metric block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
}

/// One `metric` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

/// Where a read value is written: measurement, field name and tag set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldMapping {
    pub measurement: String,
    pub field: String,
    pub tags: BTreeMap<String, String>,
}

/// A readable point: tag name, protocol address and its mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricField {
    /// Tag name, unique across the whole configuration
    pub name: String,
    /// Protocol-specific address expression
    pub address: String,
    pub mapping: FieldMapping,
}

/// Build the flat field table from metric blocks, preserving declaration order
pub fn build_fields(metrics: &[MetricConfig]) -> Result<Vec<MetricField>, ConfigError> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut fields = Vec::new();

    for metric in metrics {
        let measurement = if metric.name.is_empty() {
            DEFAULT_MEASUREMENT
        } else {
            metric.name.as_str()
        };

        if metric.fields.is_empty() {
            return Err(ConfigError::MissingMeasurementFields {
                metric: measurement.to_string(),
            });
        }

        for field in &metric.fields {
            if field.name.is_empty() {
                return Err(ConfigError::UnnamedField {
                    metric: measurement.to_string(),
                });
            }
            if !seen.insert(field.name.as_str()) {
                return Err(ConfigError::DuplicateField {
                    field: field.name.clone(),
                });
            }

            fields.push(MetricField {
                name: field.name.clone(),
                address: field.address.clone(),
                mapping: FieldMapping {
                    measurement: measurement.to_string(),
                    field: field.name.clone(),
                    tags: metric.tags.clone(),
                },
            });
        }
    }

    if fields.is_empty() {
        return Err(ConfigError::NoFieldsAtAll);
    }

    Ok(fields)
}

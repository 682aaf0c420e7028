//! Series grouper
//!
//! Collects normalized values of one cycle into metrics keyed by
//! (measurement, tag set, timestamp).

use std::collections::BTreeMap;

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::normalize::FieldValue;

/// A finished metric record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    pub timestamp: DateTime<Utc>,
}

impl Metric {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
    measurement: String,
    tags: BTreeMap<String, String>,
    timestamp: DateTime<Utc>,
}

/// Accumulates fields between drains
///
/// Metrics come out in the order their key was first seen. Writing the same
/// field twice under one key keeps the last value.
#[derive(Debug, Default)]
pub struct SeriesGrouper {
    metrics: Vec<Metric>,
    index: AHashMap<SeriesKey, usize>,
}

impl SeriesGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        measurement: &str,
        tags: &BTreeMap<String, String>,
        timestamp: DateTime<Utc>,
        field: &str,
        value: FieldValue,
    ) {
        let key = SeriesKey {
            measurement: measurement.to_string(),
            tags: tags.clone(),
            timestamp,
        };

        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = self.metrics.len();
                self.metrics.push(Metric {
                    measurement: key.measurement.clone(),
                    tags: key.tags.clone(),
                    fields: BTreeMap::new(),
                    timestamp,
                });
                self.index.insert(key, slot);
                slot
            },
        };

        self.metrics[slot].fields.insert(field.to_string(), value);
    }

    /// Hand out everything added since the last drain and reset
    pub fn drain(&mut self) -> Vec<Metric> {
        self.index.clear();
        std::mem::take(&mut self.metrics)
    }

    /// Number of pending metrics
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_same_key_merges_fields() {
        let mut grouper = SeriesGrouper::new();
        let t = tags(&[("unit", "1")]);
        grouper.add("m", &t, ts(10), "a", FieldValue::Int16(1));
        grouper.add("m", &t, ts(10), "b", FieldValue::Bool(true));

        let metrics = grouper.drain();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].fields.len(), 2);
        assert_eq!(metrics[0].field("b"), Some(&FieldValue::Bool(true)));
    }

    #[test]
    fn test_tags_and_timestamp_split_series() {
        let mut grouper = SeriesGrouper::new();
        grouper.add("m", &tags(&[("unit", "1")]), ts(10), "a", FieldValue::Int16(1));
        grouper.add("m", &tags(&[("unit", "2")]), ts(10), "a", FieldValue::Int16(2));
        grouper.add("m", &tags(&[("unit", "1")]), ts(11), "a", FieldValue::Int16(3));
        grouper.add("n", &tags(&[("unit", "1")]), ts(10), "a", FieldValue::Int16(4));

        assert_eq!(grouper.len(), 4);
    }

    #[test]
    fn test_last_write_wins() {
        let mut grouper = SeriesGrouper::new();
        let t = tags(&[]);
        grouper.add("m", &t, ts(1), "a", FieldValue::Float64(1.0));
        grouper.add("m", &t, ts(1), "a", FieldValue::Float64(2.0));

        let metrics = grouper.drain();
        assert_eq!(metrics[0].field("a"), Some(&FieldValue::Float64(2.0)));
    }

    #[test]
    fn test_drain_keeps_first_seen_order() {
        let mut grouper = SeriesGrouper::new();
        let t = tags(&[]);
        grouper.add("zeta", &t, ts(1), "a", FieldValue::Int8(1));
        grouper.add("alpha", &t, ts(1), "a", FieldValue::Int8(2));
        grouper.add("zeta", &t, ts(1), "b", FieldValue::Int8(3));

        let names: Vec<_> = grouper.drain().into_iter().map(|m| m.measurement).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_drain_resets_state() {
        let mut grouper = SeriesGrouper::new();
        assert!(grouper.drain().is_empty());
        assert!(grouper.is_empty());

        let t = tags(&[]);
        grouper.add("m", &t, ts(1), "a", FieldValue::Int8(1));
        assert_eq!(grouper.drain().len(), 1);
        assert!(grouper.is_empty());

        // a fresh key after a drain starts a new metric rather than reusing a stale slot
        grouper.add("m", &t, ts(1), "b", FieldValue::Int8(2));
        let metrics = grouper.drain();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].fields.len(), 1);
    }
}

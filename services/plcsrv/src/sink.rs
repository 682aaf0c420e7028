//! Metric sinks
//!
//! Finished metrics leave the service through a [`MetricSink`]. Two formats
//! are provided, InfluxDB line protocol and JSON lines.

use std::fmt::Write as _;
use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::grouper::Metric;
use crate::normalize::{duration_nanos, FieldValue, DATETIME_FORMAT, DATE_FORMAT, TIME_FORMAT};

/// Output encoding selected by `service.output`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Line,
    Json,
}

/// Destination for the metrics of each cycle
pub trait MetricSink: Send {
    fn emit(&mut self, metrics: &[Metric]) -> Result<()>;
}

/// Sink writing to stdout in the requested format
pub fn stdout_sink(format: OutputFormat) -> Box<dyn MetricSink> {
    match format {
        OutputFormat::Line => Box::new(LineProtocolSink::new(std::io::stdout())),
        OutputFormat::Json => Box::new(JsonSink::new(std::io::stdout())),
    }
}

/// InfluxDB line protocol, one line per metric
#[derive(Debug)]
pub struct LineProtocolSink<W> {
    writer: W,
}

impl<W: Write + Send> LineProtocolSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> MetricSink for LineProtocolSink<W> {
    fn emit(&mut self, metrics: &[Metric]) -> Result<()> {
        for metric in metrics {
            if let Some(line) = to_line_protocol(metric) {
                writeln!(self.writer, "{}", line)?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// JSON lines, one object per metric
#[derive(Debug)]
pub struct JsonSink<W> {
    writer: W,
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> MetricSink for JsonSink<W> {
    fn emit(&mut self, metrics: &[Metric]) -> Result<()> {
        for metric in metrics {
            serde_json::to_writer(&mut self.writer, metric)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Render one metric; `None` when no field is representable
pub fn to_line_protocol(metric: &Metric) -> Option<String> {
    let mut fields = String::new();
    for (key, value) in &metric.fields {
        let Some(rendered) = line_value(value) else {
            debug!("Dropping non-finite field '{}' of '{}'", key, metric.measurement);
            continue;
        };
        if !fields.is_empty() {
            fields.push(',');
        }
        let _ = write!(fields, "{}={}", escape_key(key), rendered);
    }
    if fields.is_empty() {
        return None;
    }

    let mut line = escape_measurement(&metric.measurement);
    // empty tag values are not valid line protocol
    for (key, value) in metric.tags.iter().filter(|(_, v)| !v.is_empty()) {
        let _ = write!(line, ",{}={}", escape_key(key), escape_key(value));
    }
    line.push(' ');
    line.push_str(&fields);
    if let Some(ns) = metric.timestamp.timestamp_nanos_opt() {
        let _ = write!(line, " {}", ns);
    }
    Some(line)
}

fn line_value(value: &FieldValue) -> Option<String> {
    let rendered = match value {
        FieldValue::Bool(v) => v.to_string(),
        FieldValue::Uint8(v) => format!("{v}u"),
        FieldValue::Uint16(v) => format!("{v}u"),
        FieldValue::Uint32(v) => format!("{v}u"),
        FieldValue::Uint64(v) => format!("{v}u"),
        FieldValue::Int8(v) => format!("{v}i"),
        FieldValue::Int16(v) => format!("{v}i"),
        FieldValue::Int32(v) => format!("{v}i"),
        FieldValue::Int64(v) => format!("{v}i"),
        FieldValue::Float32(v) if v.is_finite() => v.to_string(),
        FieldValue::Float64(v) if v.is_finite() => v.to_string(),
        FieldValue::Float32(_) | FieldValue::Float64(_) => return None,
        FieldValue::String(v) => quote(v),
        FieldValue::Time(v) => quote(&v.format(TIME_FORMAT).to_string()),
        FieldValue::Duration(v) => format!("{}i", duration_nanos(v)),
        FieldValue::Date(v) => quote(&v.format(DATE_FORMAT).to_string()),
        FieldValue::DateTime(v) => quote(&v.format(DATETIME_FORMAT).to_string()),
    };
    Some(rendered)
}

fn quote(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r");
    format!("\"{}\"", escaped)
}

fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,")
        .replace(' ', "\\ ")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

// tag keys, tag values and field keys share the same rules
fn escape_key(s: &str) -> String {
    s.replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::collections::BTreeMap;

    fn metric(fields: Vec<(&str, FieldValue)>) -> Metric {
        Metric {
            measurement: "m".into(),
            tags: BTreeMap::from([("unit".to_string(), "1".to_string())]),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            timestamp: Utc.timestamp_opt(1_700_000_000, 5).unwrap(),
        }
    }

    #[test]
    fn test_basic_line() {
        let line = to_line_protocol(&metric(vec![("temp", FieldValue::Float32(21.5))])).unwrap();
        assert_eq!(line, "m,unit=1 temp=21.5 1700000000000000005");
    }

    #[test]
    fn test_type_suffixes() {
        let line = to_line_protocol(&metric(vec![
            ("a", FieldValue::Int16(-3)),
            ("b", FieldValue::Uint32(7)),
            ("c", FieldValue::Bool(false)),
            ("d", FieldValue::String("say \"hi\"".into())),
            ("e", FieldValue::Duration(chrono::Duration::seconds(2))),
            ("f", FieldValue::Date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())),
        ]))
        .unwrap();

        assert_eq!(
            line,
            "m,unit=1 a=-3i,b=7u,c=false,d=\"say \\\"hi\\\"\",e=2000000000i,f=\"2024-05-01\" 1700000000000000005"
        );
    }

    #[test]
    fn test_escaping() {
        let mut m = metric(vec![("field key", FieldValue::Int8(1))]);
        m.measurement = "my measurement,x".into();
        m.tags = BTreeMap::from([
            ("site=a".to_string(), "north wing".to_string()),
            ("empty".to_string(), String::new()),
        ]);

        let line = to_line_protocol(&m).unwrap();
        assert!(line.starts_with("my\\ measurement\\,x,site\\=a=north\\ wing field\\ key=1i "));
    }

    #[test]
    fn test_line_breaks_stay_on_one_line() {
        let mut m = metric(vec![
            ("note", FieldValue::String("first\nsecond\r\n".into())),
            ("multi\nline", FieldValue::Bool(true)),
        ]);
        m.measurement = "plc\nroom".into();
        m.tags = BTreeMap::from([("site".to_string(), "north\nwing".to_string())]);

        let mut sink = LineProtocolSink::new(Vec::new());
        sink.emit(&[m]).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();

        assert_eq!(out.lines().count(), 1);
        assert!(out.starts_with("plc\\nroom,site=north\\nwing "), "{}", out);
        assert!(out.contains("multi\\nline=true"), "{}", out);
        assert!(out.contains("note=\"first\\nsecond\\r\\n\""), "{}", out);
    }

    #[test]
    fn test_non_finite_floats_are_dropped() {
        assert!(to_line_protocol(&metric(vec![("a", FieldValue::Float64(f64::NAN))])).is_none());

        let line = to_line_protocol(&metric(vec![
            ("a", FieldValue::Float32(f32::INFINITY)),
            ("b", FieldValue::Float64(1.0)),
        ]))
        .unwrap();
        assert!(line.contains(" b=1 "));
        assert!(!line.contains("a="));
    }

    #[test]
    fn test_line_sink_writes_one_line_per_metric() {
        let mut sink = LineProtocolSink::new(Vec::new());
        sink.emit(&[
            metric(vec![("a", FieldValue::Int32(1))]),
            metric(vec![("b", FieldValue::Int32(2))]),
        ])
        .unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn test_json_sink() {
        let mut sink = JsonSink::new(Vec::new());
        sink.emit(&[metric(vec![("temp", FieldValue::Float64(21.5))])])
            .unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(parsed["measurement"], "m");
        assert_eq!(parsed["tags"]["unit"], "1");
        assert_eq!(parsed["fields"]["temp"], 21.5);
    }

    #[test]
    fn test_output_format_names() {
        let format: OutputFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, OutputFormat::Json);
        assert_eq!(OutputFormat::default(), OutputFormat::Line);
    }
}

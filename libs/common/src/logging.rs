//! Unified logging module
//!
//! Console output goes to stderr (stdout is reserved for service payloads such
//! as metric lines). File output is optional and rolls daily.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Custom format for log level with brackets: `[INFO]`, `[WARN]`, etc.
fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Custom event formatter that outputs: `timestamp [LEVEL] message`
///
/// Example output: `2025-12-02T00:50:44.809000Z [INFO] Session ready`
struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Utc::now();
        write!(writer, "{} ", now.format("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::TRACE => "\x1b[35m", // magenta
                Level::DEBUG => "\x1b[34m", // blue
                Level::INFO => "\x1b[32m",  // green
                Level::WARN => "\x1b[33m",  // yellow
                Level::ERROR => "\x1b[31m", // red
            };
            write!(writer, "{}{}\x1b[0m ", color, format_level(&level))?;
        } else {
            write!(writer, "{} ", format_level(&level))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

// Keeps the non-blocking file writer alive for the whole process
static GUARDS: OnceLock<Mutex<Vec<WorkerGuard>>> = OnceLock::new();

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Service name, used as the log file prefix
    pub service_name: String,
    /// Directory for rolling log files; `None` disables file logging
    pub log_dir: Option<PathBuf>,
    /// Default filter when `RUST_LOG` is not set (e.g. "info" or "info,plcsrv=debug")
    pub level: String,
    /// JSON lines in the log file instead of the bracketed format
    pub enable_json: bool,
    /// Colored console output
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".to_string(),
            log_dir: None,
            level: "info".to_string(),
            enable_json: false,
            ansi: true,
        }
    }
}

/// Resolve the filter directive: a non-empty `RUST_LOG` wins over the configured level
pub fn filter_directive(configured: &str, env_value: Option<&str>) -> String {
    match env_value.map(str::trim) {
        Some(env) if !env.is_empty() => env.to_string(),
        _ if configured.trim().is_empty() => "info".to_string(),
        _ => configured.trim().to_string(),
    }
}

/// Initialize the global subscriber
pub fn init_with_config(config: LogConfig) -> anyhow::Result<()> {
    let env_value = std::env::var("RUST_LOG").ok();
    let directive = filter_directive(&config.level, env_value.as_deref());
    let env_filter = EnvFilter::try_new(&directive)
        .map_err(|e| anyhow::anyhow!("Invalid log filter '{}': {}", directive, e))?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.ansi)
        .event_format(BracketedLevelFormat)
        .boxed();

    let file_layer = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender =
                tracing_appender::rolling::daily(dir, format!("{}.log", config.service_name));
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);

            let guards = GUARDS.get_or_init(|| Mutex::new(Vec::new()));
            match guards.lock() {
                Ok(mut guards) => guards.push(guard),
                Err(poisoned) => poisoned.into_inner().push(guard),
            }

            let layer = if config.enable_json {
                fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_level(true)
                    .with_target(true)
                    .boxed()
            } else {
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .event_format(BracketedLevelFormat)
                    .boxed()
            };
            Some(layer)
        },
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;

    match &config.log_dir {
        Some(dir) => tracing::info!("Logging: {} @ {:?} ({})", config.service_name, dir, directive),
        None => tracing::info!("Logging: {} console only ({})", config.service_name, directive),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_overrides_config() {
        assert_eq!(filter_directive("info", Some("debug,plcsrv=trace")), "debug,plcsrv=trace");
        assert_eq!(filter_directive("warn", Some("  ")), "warn");
        assert_eq!(filter_directive("warn", None), "warn");
        assert_eq!(filter_directive("", None), "info");
    }

    #[test]
    fn test_format_level() {
        assert_eq!(format_level(&Level::INFO), "[INFO]");
        assert_eq!(format_level(&Level::ERROR), "[ERROR]");
    }
}

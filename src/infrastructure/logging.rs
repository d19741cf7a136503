//! Logging setup for the extension module
//!
//! Everything in the crate logs through `tracing` macros; nothing is emitted
//! until a host installs a subscriber. `init_logging` builds one from a
//! `LogConfig`, and `init_once` does so at most once per process, which is
//! what the import hook uses.

use std::path::Path;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use tracing::Level;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    registry::Registry,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Environment variables read by `LogConfig::from_env`
pub const ENV_LEVEL: &str = "DTCORE_LOG_LEVEL";
pub const ENV_FORMAT: &str = "DTCORE_LOG_FORMAT";
pub const ENV_DIR: &str = "DTCORE_LOG_DIR";
pub const ENV_FILTER: &str = "DTCORE_LOG_FILTER";

static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();
static LOGGER_GUARD: Lazy<Mutex<Option<WorkerGuard>>> = Lazy::new(|| Mutex::new(None));

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format `{}`", other)),
        }
    }
}

/// Log output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// Daily-rotated files `directory/prefix.YYYY-MM-DD`
    File { directory: String, prefix: String },
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Emit span open/close events (the init sequencer runs inside a span)
    pub span_events: bool,
    /// Extra directives, e.g. "dtcore::args=trace,dtcore::module=debug"
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            span_events: false,
            filter: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `DTCORE_LOG_*` variables; malformed values are ignored
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(level) = lookup(ENV_LEVEL).and_then(|s| s.parse().ok()) {
            config.level = level;
        }
        if let Some(format) = lookup(ENV_FORMAT).and_then(|s| s.parse().ok()) {
            config.format = format;
        }
        if let Some(directory) = lookup(ENV_DIR) {
            config.output = LogOutput::File {
                directory,
                prefix: "dtcore".to_string(),
            };
        }
        config.filter = lookup(ENV_FILTER);
        config
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_log_dir(self, log_dir: impl AsRef<Path>) -> Self {
        self.with_output(LogOutput::File {
            directory: log_dir.as_ref().to_string_lossy().to_string(),
            prefix: "dtcore".to_string(),
        })
    }
}

/// Install the global subscriber
///
/// The returned guard flushes buffered records when dropped. Returns `None`
/// when another subscriber is already installed.
pub fn init_logging(config: LogConfig) -> Option<WorkerGuard> {
    let filter = build_filter(&config);
    let spans = span_events_config(config.span_events);

    let (writer, guard) = match &config.output {
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::Stderr => tracing_appender::non_blocking(std::io::stderr()),
        LogOutput::File { directory, prefix } => {
            tracing_appender::non_blocking(rolling::daily(directory, prefix))
        }
    };

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .pretty()
            .with_span_events(spans)
            .with_filter(filter)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .with_writer(writer)
            .compact()
            .with_span_events(spans)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_writer(writer)
            .json()
            .with_span_events(spans)
            .with_filter(filter)
            .boxed(),
    };

    match tracing_subscriber::registry().with(layer).try_init() {
        Ok(()) => Some(guard),
        Err(err) => {
            tracing::debug!(error = %err, "subscriber already installed");
            None
        }
    }
}

/// Install the subscriber unless this process already did; true on first call
pub fn init_once(config: LogConfig) -> bool {
    let mut first = false;
    LOGGER_INITIALIZED.get_or_init(|| {
        first = true;
        *LOGGER_GUARD.lock() = init_logging(config);
    });
    first
}

pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    let base = EnvFilter::from_default_env().add_directive(config.level.into());

    match &config.filter {
        Some(directives) => directives
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .fold(base, |filter, directive| {
                filter.add_directive(directive.parse().unwrap_or_else(|_| {
                    tracing::warn!("Invalid filter directive: {}", directive);
                    config.level.into()
                }))
            }),
        None => base,
    }
}

fn span_events_config(enabled: bool) -> FmtSpan {
    if enabled {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_builder() {
        let config = LogConfig::new()
            .with_level(Level::DEBUG)
            .with_format(LogFormat::Json)
            .with_span_events(true)
            .with_filter("dtcore=trace");

        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.span_events);
        assert_eq!(config.filter.as_deref(), Some("dtcore=trace"));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_LEVEL, "debug"),
            (ENV_FORMAT, "JSON"),
            (ENV_DIR, "/tmp/dtcore-logs"),
        ]
        .into_iter()
        .collect();
        let config = LogConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(
            config.output,
            LogOutput::File {
                directory: "/tmp/dtcore-logs".into(),
                prefix: "dtcore".into()
            }
        );
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_malformed_env_ignored() {
        let config = LogConfig::from_lookup(|k| match k {
            ENV_LEVEL => Some("loud".into()),
            ENV_FORMAT => Some("xml".into()),
            _ => None,
        });
        assert_eq!(config.level, Level::WARN);
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.output, LogOutput::Stderr);
    }

    #[test]
    fn test_init_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig::new().with_log_dir(dir.path());
        init_once(config.clone());
        assert!(is_initialized());
        assert!(!init_once(config));
    }
}

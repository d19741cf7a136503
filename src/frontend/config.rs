use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::infrastructure::logging::{LogConfig, LogFormat, LogOutput};

/// File name searched for by `Config::discover`
pub const CONFIG_FILE_NAME: &str = ".dtcorerc.toml";

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "DTCORE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub options: OptionsConfig,

    #[serde(default)]
    pub module: ModuleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormatConfig,

    /// Extra filter directives, e.g. "dtcore::args=trace"
    #[serde(default)]
    pub filter: Option<String>,

    /// Directory for daily-rotated log files; stderr when absent
    #[serde(default)]
    pub directory: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormatConfig {
    Pretty,
    #[default]
    Compact,
    Json,
}

/// Option values applied after the init sequencer resets option state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionsConfig {
    #[serde(default)]
    pub nthreads: Option<usize>,

    #[serde(default)]
    pub force_stype: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    #[serde(default)]
    pub name: Option<String>,

    /// Verify argument bundles before each call; follows the build profile when unset
    #[serde(default)]
    pub debug_checks: Option<bool>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormatConfig::default(),
            filter: None,
            directory: None,
        }
    }
}

fn default_level() -> String { "warn".to_string() }

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load the file named by `DTCORE_CONFIG`, if set
    pub fn from_env() -> Option<Result<Self, ConfigError>> {
        std::env::var_os(CONFIG_ENV_VAR).map(|path| Self::load(Path::new(&path)))
    }

    /// Find and load configuration file from current directory or parents
    pub fn discover() -> Self {
        std::env::current_dir()
            .ok()
            .and_then(|dir| Self::discover_from(&dir))
            .unwrap_or_default()
    }

    /// Walk up from `start` looking for `.dtcorerc.toml`
    pub fn discover_from(start: &Path) -> Option<Self> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
            .find_map(|path| Self::load(&path).ok())
    }

    /// Logging settings in the form `init_logging` expects
    pub fn log_config(&self) -> LogConfig {
        let level = self.logging.level.parse().unwrap_or(tracing::Level::WARN);
        let format = match self.logging.format {
            LogFormatConfig::Pretty => LogFormat::Pretty,
            LogFormatConfig::Compact => LogFormat::Compact,
            LogFormatConfig::Json => LogFormat::Json,
        };
        let output = match &self.logging.directory {
            Some(directory) => LogOutput::File {
                directory: directory.clone(),
                prefix: "dtcore".to_string(),
            },
            None => LogOutput::Stderr,
        };
        let config = LogConfig::new()
            .with_level(level)
            .with_format(format)
            .with_output(output);
        match &self.logging.filter {
            Some(filter) => config.with_filter(filter.clone()),
            None => config,
        }
    }

    /// Generate default configuration file content
    pub fn generate_default() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate config"))
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;

        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormatConfig::Compact);
        assert!(config.options.nthreads.is_none());
        assert!(config.module.debug_checks.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[logging]
level = "debug"
format = "json"

[options]
nthreads = 4
force_stype = "int32"

[module]
name = "_custom"
debug_checks = false
"#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormatConfig::Json);
        assert_eq!(config.options.nthreads, Some(4));
        assert_eq!(config.options.force_stype.as_deref(), Some("int32"));
        assert_eq!(config.module.name.as_deref(), Some("_custom"));
        assert_eq!(config.module.debug_checks, Some(false));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(Config::parse("[options]\nnthreads = \"x\""), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_log_config() {
        let config =
            Config::parse("[logging]\nlevel = \"trace\"\nfilter = \"dtcore=trace\"").unwrap();
        let log = config.log_config();
        assert_eq!(log.level, tracing::Level::TRACE);
        assert_eq!(log.output, LogOutput::Stderr);
        assert_eq!(log.filter.as_deref(), Some("dtcore=trace"));
    }

    #[test]
    fn test_save_and_discover() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let mut config = Config::default();
        config.options.nthreads = Some(2);
        config.save(&dir.path().join(CONFIG_FILE_NAME)).unwrap();

        let found = Config::discover_from(&nested).unwrap();
        assert_eq!(found, config);
    }

    #[test]
    fn test_generate_default_roundtrip() {
        let text = Config::generate_default();
        assert_eq!(Config::parse(&text).unwrap(), Config::default());
    }
}

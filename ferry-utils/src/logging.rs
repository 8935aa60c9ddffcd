//! Logging infrastructure for ferry
//!
//! Sets up `tracing` subscribers for the relay daemon.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{paths, FerryError, Result};

/// Environment variable holding the log filter
pub const LOG_ENV_VAR: &str = "FERRY_LOG";

/// Log file name under the log directory unless configured otherwise
pub const DEFAULT_LOG_FILE: &str = "ferry.log";

/// Log output destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogOutput {
    /// Log to stderr
    #[default]
    Stderr,
    /// Log to `<state>/log/<file_name>`
    File,
    /// Log to both stderr and file
    Both,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output destination
    pub output: LogOutput,
    /// Log level filter (e.g., "info", "ferry_server=debug")
    pub filter: String,
    /// File name inside the log directory
    pub file_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: "info".into(),
            file_name: DEFAULT_LOG_FILE.into(),
        }
    }
}

impl LogConfig {
    /// Config for the relay daemon; `FERRY_LOG` takes precedence over
    /// `default_filter`
    pub fn server(default_filter: &str) -> Self {
        Self {
            filter: std::env::var(LOG_ENV_VAR).unwrap_or_else(|_| default_filter.to_string()),
            ..Self::default()
        }
    }

    /// Same config, writing to `output`
    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Same config, logging to `file_name` inside the log directory
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Where `File` and `Both` outputs write
    pub fn log_file_path(&self) -> PathBuf {
        paths::log_dir().join(&self.file_name)
    }
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| FerryError::config(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    match config.output {
        LogOutput::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| FerryError::internal(format!("Failed to init logging: {}", e)))?;
        }
        LogOutput::File => {
            let file = open_log_file(&config.log_file_path())?;

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(file).with_ansi(false))
                .try_init()
                .map_err(|e| FerryError::internal(format!("Failed to init logging: {}", e)))?;
        }
        LogOutput::Both => {
            let file = open_log_file(&config.log_file_path())?;

            let file_layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(std::io::stderr))
                .with(file_layer)
                .try_init()
                .map_err(|e| FerryError::internal(format!("Failed to init logging: {}", e)))?;
        }
    }

    Ok(())
}

fn open_log_file(log_path: &Path) -> Result<File> {
    if let Some(log_dir) = log_path.parent() {
        std::fs::create_dir_all(log_dir).map_err(|e| FerryError::FileWrite {
            path: log_dir.to_path_buf(),
            source: e,
        })?;
    }

    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|e| FerryError::FileWrite {
            path: log_path.to_path_buf(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.output, LogOutput::Stderr);
        assert_eq!(config.filter, "info");
        assert_eq!(config.file_name, DEFAULT_LOG_FILE);
    }

    #[test]
    fn test_log_config_server_filter_from_env() {
        let original = env::var(LOG_ENV_VAR).ok();

        env::set_var(LOG_ENV_VAR, "ferry_server=debug");
        assert_eq!(LogConfig::server("warn").filter, "ferry_server=debug");

        env::remove_var(LOG_ENV_VAR);
        assert_eq!(LogConfig::server("warn").filter, "warn");

        if let Some(val) = original {
            env::set_var(LOG_ENV_VAR, val);
        }
    }

    #[test]
    fn test_with_output_and_file_name() {
        let config = LogConfig::default()
            .with_output(LogOutput::Both)
            .with_file_name("relay.log");
        assert_eq!(config.output, LogOutput::Both);
        assert!(config.log_file_path().ends_with("log/relay.log"));
        assert!(config.log_file_path().starts_with(paths::log_dir()));
    }

    #[test]
    fn test_open_log_file_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ferry.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let config = LogConfig {
            filter: "ferry=notalevel".into(),
            ..LogConfig::default()
        };
        let result = init_logging_with_config(config);
        assert!(matches!(result, Err(FerryError::Config(_))));
    }
}

//! Configuration loader

use std::net::SocketAddr;
use std::path::Path;

use ferry_utils::{config_file, FerryError, LogOutput, Result};

use super::AppConfig;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from default location
    pub fn load() -> Result<AppConfig> {
        let path = config_file();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            Ok(AppConfig::default())
        }
    }

    /// Load from an explicit path if given, the default location otherwise
    pub fn load_from(path: Option<&Path>) -> Result<AppConfig> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<AppConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| FerryError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration from string
    pub fn parse(content: &str, path: &Path) -> Result<AppConfig> {
        toml::from_str(content).map_err(|e| FerryError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate configuration
    pub fn validate(config: &AppConfig) -> Result<()> {
        if config.server.bind.parse::<SocketAddr>().is_err() {
            return Err(FerryError::config(format!(
                "bind must be an ip:port address, got {:?}",
                config.server.bind
            )));
        }

        if config.server.outbound_queue == 0 {
            return Err(FerryError::config("outbound_queue must be at least 1"));
        }

        let protocol = &config.protocol;
        if protocol.name_max_bytes == 0
            || protocol.control_max_bytes == 0
            || protocol.file_chunk_bytes == 0
        {
            return Err(FerryError::config(
                "name_max_bytes, control_max_bytes and file_chunk_bytes must be non-zero",
            ));
        }

        let logging = &config.logging;
        if logging.output != LogOutput::Stderr && logging.file_name.trim().is_empty() {
            return Err(FerryError::config("logging.file_name is required for file output"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BroadcastPolicy;
    use ferry_protocol::FramingMode;
    use tempfile::tempdir;

    #[test]
    fn test_load_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(
            &path,
            r#"
            [server]
            bind = "127.0.0.1:4000"

            [protocol]
            framing = "chunk"

            [routing]
            broadcast = "first-peer"
            "#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:4000");
        assert_eq!(config.protocol.framing, FramingMode::Chunk);
        assert_eq!(config.routing.broadcast, BroadcastPolicy::FirstPeer);
        // Unspecified fields keep their defaults
        assert_eq!(config.protocol.control_max_bytes, 1024);
        assert_eq!(config.server.outbound_queue, 256);
    }

    #[test]
    fn test_load_from_missing_path() {
        let dir = tempdir().unwrap();
        let result = ConfigLoader::load_from(Some(&dir.path().join("nope.toml")));
        assert!(matches!(result, Err(FerryError::FileRead { .. })));
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = ConfigLoader::parse("invalid { toml", Path::new("test.toml"));
        assert!(matches!(result, Err(FerryError::ConfigInvalid { .. })));
    }

    #[test]
    fn test_parse_unknown_policy() {
        let result = ConfigLoader::parse(
            "[routing]\nbroadcast = \"everyone\"\n",
            Path::new("test.toml"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_logging_section() {
        let config = ConfigLoader::parse(
            "[logging]\noutput = \"both\"\nfile_name = \"relay.log\"\n",
            Path::new("test.toml"),
        )
        .unwrap();
        assert_eq!(config.logging.output, LogOutput::Both);
        assert_eq!(config.logging.file_name, "relay.log");
        assert_eq!(config.logging.filter, "info");

        let result = ConfigLoader::parse("[logging]\noutput = \"syslog\"\n", Path::new("test.toml"));
        assert!(matches!(result, Err(FerryError::ConfigInvalid { .. })));
    }

    #[test]
    fn test_validate_file_logging_needs_name() {
        let mut config = AppConfig::default();
        config.logging.output = LogOutput::File;
        config.logging.file_name = " ".into();
        assert!(ConfigLoader::validate(&config).is_err());

        config.logging.output = LogOutput::Stderr;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_validate_defaults() {
        assert!(ConfigLoader::validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_bad_bind() {
        let mut config = AppConfig::default();
        config.server.bind = "localhost".into();
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_validate_zero_sizes() {
        let mut config = AppConfig::default();
        config.protocol.file_chunk_bytes = 0;
        assert!(ConfigLoader::validate(&config).is_err());

        let mut config = AppConfig::default();
        config.server.outbound_queue = 0;
        assert!(ConfigLoader::validate(&config).is_err());
    }
}

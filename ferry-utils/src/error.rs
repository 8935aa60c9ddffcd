//! Error types for ferry
//!
//! Provides the unified error type used across the ferry crates.

use std::path::PathBuf;

/// Main error type for ferry operations
#[derive(Debug, thiserror::Error)]
pub enum FerryError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Listener Errors ===

    #[error("Failed to bind listener to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FerryError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using FerryError
pub type Result<T> = std::result::Result<T, FerryError>;

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Display Tests ====================

    #[test]
    fn test_error_display_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = FerryError::Io(io_err);
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err = FerryError::FileRead {
            path: PathBuf::from("/etc/ferry/config.toml"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/etc/ferry/config.toml"));
    }

    #[test]
    fn test_error_display_bind() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err = FerryError::Bind {
            addr: "0.0.0.0:2323".into(),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("0.0.0.0:2323"));
        assert!(msg.contains("address in use"));
    }

    #[test]
    fn test_error_display_config_invalid() {
        let err = FerryError::ConfigInvalid {
            path: PathBuf::from("/home/user/.config/ferry/config.toml"),
            message: "syntax error".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Invalid configuration"));
        assert!(msg.contains("syntax error"));
    }

    // ==================== Constructor Tests ====================

    #[test]
    fn test_error_constructors() {
        assert!(matches!(FerryError::config("x"), FerryError::Config(_)));
        assert!(matches!(FerryError::internal("x"), FerryError::Internal(_)));
    }

    #[test]
    fn test_from_io_error() {
        fn fails() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(FerryError::Io(_))));
    }
}

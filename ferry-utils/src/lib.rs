//! ferry-utils: Common utilities shared across ferry crates
//!
//! This crate provides:
//! - Unified error types ([`FerryError`], [`Result`])
//! - Logging infrastructure ([`init_logging_with_config`], [`LogConfig`])
//! - XDG-compliant path utilities ([`paths`] module)

pub mod error;
pub mod logging;
pub mod paths;

pub use error::{FerryError, Result};
pub use logging::{init_logging_with_config, LogConfig, LogOutput, DEFAULT_LOG_FILE};

pub use paths::{config_dir, config_file, log_dir, state_dir};

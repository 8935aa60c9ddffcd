//! Configuration schema structs

use serde::Deserialize;

use ferry_protocol::{
    FramingMode, DEFAULT_CONTROL_MAX_BYTES, DEFAULT_FILE_CHUNK_BYTES, DEFAULT_NAME_MAX_BYTES,
};
use ferry_utils::{LogOutput, DEFAULT_LOG_FILE};

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub protocol: ProtocolConfig,
    pub routing: RoutingConfig,
    pub logging: LoggingConfig,
}

/// Listener settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the TCP listener binds to
    pub bind: String,
    /// Capacity of each connection's outbound queue
    pub outbound_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:2323".into(),
            outbound_queue: 256,
        }
    }
}

/// Wire protocol settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub framing: FramingMode,
    /// Limit on the join frame carrying the display name
    pub name_max_bytes: usize,
    /// Limit on a single control frame
    pub control_max_bytes: usize,
    /// Largest read when relaying a file payload
    pub file_chunk_bytes: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            framing: FramingMode::default(),
            name_max_bytes: DEFAULT_NAME_MAX_BYTES,
            control_max_bytes: DEFAULT_CONTROL_MAX_BYTES,
            file_chunk_bytes: DEFAULT_FILE_CHUNK_BYTES,
        }
    }
}

/// Message routing settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub broadcast: BroadcastPolicy,
}

/// Which peers receive a broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BroadcastPolicy {
    /// Every registered connection except the sender
    #[default]
    AllPeers,
    /// Only the earliest-registered other connection (legacy behaviour)
    FirstPeer,
}

/// Log destination and verbosity
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `stderr`, `file` or `both`
    pub output: LogOutput,
    /// Filter used when `FERRY_LOG` is unset
    pub filter: String,
    /// File name inside the state log directory
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: "info".into(),
            file_name: DEFAULT_LOG_FILE.into(),
        }
    }
}

//! Default configuration values
//!
//! Written out as TOML for reference; must stay in sync with the
//! `Default` impls in `schema.rs`.

#[allow(dead_code)]
pub const DEFAULT_CONFIG_TOML: &str = r##"
# ferry configuration

[server]
bind = "0.0.0.0:2323"
outbound_queue = 256

[protocol]
# "line" (newline-terminated control frames) or "chunk" (one read per frame)
framing = "line"
name_max_bytes = 64
control_max_bytes = 1024
file_chunk_bytes = 4096

[routing]
# "all-peers" or "first-peer"
broadcast = "all-peers"

[logging]
# "stderr", "file" or "both"; files go under the XDG state dir
output = "stderr"
# overridden by FERRY_LOG
filter = "info"
file_name = "ferry.log"
"##;

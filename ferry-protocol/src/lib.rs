//! ferry-protocol: wire protocol shared by the relay and its clients
//!
//! A client speaks over one untyped byte stream: a join frame carrying its
//! display name, then control frames (broadcast text, `@recipient:` private
//! messages, `file:` directives) interleaved with raw file payloads.

pub mod codec;
pub mod directive;

pub use codec::{CodecError, ControlCodec, FramingMode};
pub use directive::{
    format_broadcast, format_private, parse_display_name, DirectiveError, Inbound,
    TransferDescriptor, FILE_TAG, PRIVATE_SIGIL,
};

/// Maximum size of the join frame
pub const DEFAULT_NAME_MAX_BYTES: usize = 64;

/// Maximum size of a control frame
pub const DEFAULT_CONTROL_MAX_BYTES: usize = 1024;

/// Chunk size used when relaying file payloads
pub const DEFAULT_FILE_CHUNK_BYTES: usize = 4096;

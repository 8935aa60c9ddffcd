//! Control frame codec
//!
//! Splits the inbound byte stream into control frames. Two framings exist:
//! `Line` (newline-terminated control frames) and `Chunk`, where every
//! single read is taken as one frame.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Deserialize;
use tokio_util::codec::Decoder;

/// Bytes requested per read when looking for a line terminator
const LINE_READ_SIZE: usize = 4096;

/// How control frames are delimited on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FramingMode {
    /// `\n`-terminated control frames, bytes after a directive stay buffered
    #[default]
    Line,
    /// One read of at most `max_len` bytes is one frame
    Chunk,
}

impl FramingMode {
    /// Bytes closing every outbound text frame
    pub fn terminator(self) -> &'static [u8] {
        match self {
            FramingMode::Line => b"\n",
            FramingMode::Chunk => b"",
        }
    }

    /// Frame outbound text for the wire
    pub fn frame(self, text: &str) -> Bytes {
        let terminator = self.terminator();
        let mut buf = BytesMut::with_capacity(text.len() + terminator.len());
        buf.put_slice(text.as_bytes());
        buf.put_slice(terminator);
        buf.freeze()
    }
}

/// Control codec error
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Control frame exceeds {max} bytes")]
    FrameTooLong { max: usize },
}

/// Decoder for inbound control frames
#[derive(Debug, Clone)]
pub struct ControlCodec {
    mode: FramingMode,
    max_len: usize,
    /// Dropping the rest of an over-long line
    discarding: bool,
}

impl ControlCodec {
    pub fn new(mode: FramingMode, max_len: usize) -> Self {
        Self {
            mode,
            max_len,
            discarding: false,
        }
    }

    /// Change the frame limit (the join frame and control frames differ)
    pub fn set_max_len(&mut self, max_len: usize) {
        self.max_len = max_len;
    }

    /// How many bytes a single read should ask the transport for
    pub fn read_size(&self) -> usize {
        match self.mode {
            FramingMode::Chunk => self.max_len,
            FramingMode::Line => LINE_READ_SIZE.max(self.max_len + 1),
        }
    }

    fn decode_line(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, CodecError> {
        loop {
            let newline = src.iter().position(|b| *b == b'\n');

            if self.discarding {
                match newline {
                    Some(offset) => {
                        let _ = src.split_to(offset + 1);
                        self.discarding = false;
                        continue;
                    }
                    None => {
                        src.clear();
                        return Ok(None);
                    }
                }
            }

            return match newline {
                Some(offset) if offset <= self.max_len => {
                    let mut line = src.split_to(offset + 1);
                    line.truncate(offset);
                    if line.last() == Some(&b'\r') {
                        line.truncate(offset - 1);
                    }
                    Ok(Some(line))
                }
                Some(offset) => {
                    let _ = src.split_to(offset + 1);
                    Err(CodecError::FrameTooLong { max: self.max_len })
                }
                None if src.len() > self.max_len => {
                    src.clear();
                    self.discarding = true;
                    Err(CodecError::FrameTooLong { max: self.max_len })
                }
                None => Ok(None),
            };
        }
    }
}

impl Decoder for ControlCodec {
    type Item = BytesMut;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.mode {
            FramingMode::Line => self.decode_line(src),
            FramingMode::Chunk => {
                if src.is_empty() {
                    return Ok(None);
                }
                let len = src.len().min(self.max_len);
                Ok(Some(src.split_to(len)))
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        // Unterminated trailing line
        if self.discarding || src.is_empty() {
            src.clear();
            self.discarding = false;
            return Ok(None);
        }
        Ok(Some(src.split()))
    }
}

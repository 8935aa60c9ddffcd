//! Control message classification
//!
//! Every inbound control frame is one of: a broadcast line, a private
//! message (`@<recipient>:<body>`) or a file-forward directive
//! (`file:<byte_count>:<file_name>:<relative_folder>:<recipient>`).

use std::fmt;

/// Leading sigil of a private message
pub const PRIVATE_SIGIL: char = '@';

/// Leading tag of a file-forward directive
pub const FILE_TAG: &str = "file:";

/// Number of `:`-separated fields after [`FILE_TAG`]
const FILE_FIELDS: usize = 4;

/// Errors raised while interpreting a control frame
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectiveError {
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,

    #[error("display name is empty")]
    EmptyName,

    #[error("private message is missing the ':' separator")]
    MissingSeparator,

    #[error("file directive has {found} of {expected} fields")]
    MissingFields { expected: usize, found: usize },

    #[error("invalid byte count: {0:?}")]
    InvalidByteCount(String),
}

/// Parameters of a single file-forward operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferDescriptor {
    /// Number of raw bytes that follow the directive
    pub byte_count: u64,
    pub file_name: String,
    pub relative_folder: String,
    /// Display name of the receiving client
    pub recipient: String,
}

impl TransferDescriptor {
    /// Parse a full `file:` directive line
    ///
    /// The recipient field takes the remainder of the line, so it may itself
    /// contain `:`.
    pub fn parse(line: &str) -> Result<Self, DirectiveError> {
        let rest = line.strip_prefix(FILE_TAG).unwrap_or(line);
        let fields: Vec<&str> = rest.splitn(FILE_FIELDS, ':').collect();
        if fields.len() < FILE_FIELDS {
            return Err(DirectiveError::MissingFields {
                expected: FILE_FIELDS,
                found: fields.len(),
            });
        }

        let byte_count = fields[0]
            .trim()
            .parse::<u64>()
            .map_err(|_| DirectiveError::InvalidByteCount(fields[0].to_string()))?;

        Ok(Self {
            byte_count,
            file_name: fields[1].to_string(),
            relative_folder: fields[2].to_string(),
            recipient: fields[3].to_string(),
        })
    }
}

/// Renders the directive line; the server sends this verbatim as the
/// incoming-file notice.
impl fmt::Display for TransferDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}:{}:{}",
            FILE_TAG, self.byte_count, self.file_name, self.relative_folder, self.recipient
        )
    }
}

/// A classified inbound control frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Text for every other connected client
    Broadcast(String),
    /// Text for a single named client
    Private { recipient: String, body: String },
    /// Raw bytes for a single named client follow this directive
    FileForward(TransferDescriptor),
}

impl Inbound {
    /// Classify a control frame
    pub fn classify(frame: &[u8]) -> Result<Self, DirectiveError> {
        let text = std::str::from_utf8(frame).map_err(|_| DirectiveError::InvalidUtf8)?;

        if let Some(rest) = text.strip_prefix(PRIVATE_SIGIL) {
            let (recipient, body) = rest
                .split_once(':')
                .ok_or(DirectiveError::MissingSeparator)?;
            return Ok(Self::Private {
                recipient: recipient.to_string(),
                body: body.to_string(),
            });
        }

        if text.starts_with(FILE_TAG) {
            return TransferDescriptor::parse(text).map(Self::FileForward);
        }

        Ok(Self::Broadcast(text.to_string()))
    }
}

/// Decode the join frame into a display name
pub fn parse_display_name(frame: &[u8]) -> Result<String, DirectiveError> {
    let text = std::str::from_utf8(frame).map_err(|_| DirectiveError::InvalidUtf8)?;
    let name = text.trim();
    if name.is_empty() {
        return Err(DirectiveError::EmptyName);
    }
    Ok(name.to_string())
}

/// `HH:MM:SS sender: text`
pub fn format_broadcast(time: &str, sender: &str, text: &str) -> String {
    format!("{} {}: {}", time, sender, text)
}

/// `HH:MM:SS sender (private): body`
pub fn format_private(time: &str, sender: &str, body: &str) -> String {
    format!("{} {} (private): {}", time, sender, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Classification Tests ====================

    #[test]
    fn test_classify_broadcast() {
        let msg = Inbound::classify(b"hello everyone").unwrap();
        assert_eq!(msg, Inbound::Broadcast("hello everyone".into()));
    }

    #[test]
    fn test_classify_private() {
        let msg = Inbound::classify(b"@bob:hi").unwrap();
        assert_eq!(
            msg,
            Inbound::Private {
                recipient: "bob".into(),
                body: "hi".into(),
            }
        );
    }

    #[test]
    fn test_classify_private_splits_once() {
        let msg = Inbound::classify(b"@bob:meet at 10:30").unwrap();
        assert_eq!(
            msg,
            Inbound::Private {
                recipient: "bob".into(),
                body: "meet at 10:30".into(),
            }
        );
    }

    #[test]
    fn test_classify_private_without_separator() {
        let err = Inbound::classify(b"@bob hi").unwrap_err();
        assert_eq!(err, DirectiveError::MissingSeparator);
    }

    #[test]
    fn test_classify_file_directive() {
        let msg = Inbound::classify(b"file:10:notes.txt:docs:bob").unwrap();
        match msg {
            Inbound::FileForward(t) => {
                assert_eq!(t.byte_count, 10);
                assert_eq!(t.file_name, "notes.txt");
                assert_eq!(t.relative_folder, "docs");
                assert_eq!(t.recipient, "bob");
            }
            other => panic!("Expected FileForward, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_invalid_utf8() {
        let err = Inbound::classify(&[0xff, 0xfe, b'a']).unwrap_err();
        assert_eq!(err, DirectiveError::InvalidUtf8);
    }

    #[test]
    fn test_file_prefix_is_case_sensitive() {
        let msg = Inbound::classify(b"File:10:a:b:c").unwrap();
        assert!(matches!(msg, Inbound::Broadcast(_)));
    }

    // ==================== Transfer Descriptor Tests ====================

    #[test]
    fn test_descriptor_missing_fields() {
        let err = TransferDescriptor::parse("file:10:notes.txt").unwrap_err();
        assert_eq!(
            err,
            DirectiveError::MissingFields {
                expected: 4,
                found: 2,
            }
        );
    }

    #[test]
    fn test_descriptor_rejects_negative_count() {
        let err = TransferDescriptor::parse("file:-5:a:b:bob").unwrap_err();
        assert_eq!(err, DirectiveError::InvalidByteCount("-5".into()));
    }

    #[test]
    fn test_descriptor_rejects_non_numeric_count() {
        let err = TransferDescriptor::parse("file:ten:a:b:bob").unwrap_err();
        assert!(matches!(err, DirectiveError::InvalidByteCount(_)));
    }

    #[test]
    fn test_descriptor_recipient_takes_remainder() {
        let t = TransferDescriptor::parse("file:3:a.bin:out:bob:extra").unwrap();
        assert_eq!(t.recipient, "bob:extra");
    }

    #[test]
    fn test_descriptor_empty_folder() {
        let t = TransferDescriptor::parse("file:0:a.bin::bob").unwrap();
        assert_eq!(t.byte_count, 0);
        assert_eq!(t.relative_folder, "");
    }

    #[test]
    fn test_descriptor_display_matches_wire_form() {
        let line = "file:10:notes.txt:docs:bob";
        let t = TransferDescriptor::parse(line).unwrap();
        assert_eq!(t.to_string(), line);
    }

    // ==================== Name & Formatting Tests ====================

    #[test]
    fn test_parse_display_name_trims() {
        assert_eq!(parse_display_name(b"alice\r\n").unwrap(), "alice");
    }

    #[test]
    fn test_parse_display_name_empty() {
        assert_eq!(parse_display_name(b"  \n").unwrap_err(), DirectiveError::EmptyName);
    }

    #[test]
    fn test_format_broadcast() {
        assert_eq!(
            format_broadcast("12:00:01", "alice", "hello"),
            "12:00:01 alice: hello"
        );
    }

    #[test]
    fn test_format_private() {
        assert_eq!(
            format_private("12:00:01", "alice", "hi"),
            "12:00:01 alice (private): hi"
        );
    }
}

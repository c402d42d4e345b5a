//! Line codec.
//!
//! Wire format:
//! ```text
//! +---------------------+------+
//! | UTF-8 TEXT (N bytes) | \n  |
//! +---------------------+------+
//! ```
//!
//! No length prefix, no escaping, no header. Incoming lines may also end in
//! `\r\n`; the carriage return is stripped.

/// Line terminator written after every message.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Longest incoming line accepted, terminator excluded.
///
/// The protocol has no limit of its own; this only stops a peer that never
/// sends a newline from growing the read buffer forever.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// A line the local user asked to send.
///
/// Construction rejects empty and whitespace-only input, so holding one
/// means there is something to put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage(String);

impl OutgoingMessage {
    /// Validate user input.
    ///
    /// Returns `None` for empty or whitespace-only text. The text is kept
    /// verbatim otherwise (no trimming).
    pub fn new(text: &str) -> Option<Self> {
        if text.trim().is_empty() {
            return None;
        }
        Some(Self(text.to_string()))
    }

    /// Message text as typed.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wire bytes for this message.
    pub fn to_wire(&self) -> Vec<u8> {
        encode_line(&self.0)
    }
}

/// Encode `text` as one wire line (text followed by a single `\n`).
pub fn encode_line(text: &str) -> Vec<u8> {
    let mut wire = Vec::with_capacity(text.len() + 1);
    wire.extend_from_slice(text.as_bytes());
    wire.push(LINE_TERMINATOR);
    wire
}

/// Decode one raw line read from the wire.
///
/// Strips a trailing `\n` or `\r\n`. A final line without terminator (peer
/// closed mid-line) is returned as-is. Invalid UTF-8 is replaced rather than
/// rejected.
pub fn decode_line(raw: &[u8]) -> String {
    let body = raw.strip_suffix(b"\n").unwrap_or(raw);
    let body = body.strip_suffix(b"\r").unwrap_or(body);
    String::from_utf8_lossy(body).into_owned()
}

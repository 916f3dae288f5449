use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;

/// Bytes requested per socket read: 4 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024;

/// Overall receive deadline for one response: 30 seconds.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on an accumulated response: 64 MiB.
pub const DEFAULT_MAX_DOCUMENT_SIZE: usize = 64 * 1024 * 1024;

/// A complete response document.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The exact bytes received from the peer.
    pub payload: Bytes,
    /// The parsed document.
    pub value: Value,
}

impl Frame {
    /// Create a new frame.
    pub fn new(payload: impl Into<Bytes>, value: Value) -> Self {
        Self {
            payload: payload.into(),
            value,
        }
    }

    /// Size of the document on the wire.
    pub fn wire_size(&self) -> usize {
        self.payload.len()
    }

    /// Consume the frame, keeping the parsed document.
    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Try to decode `buf` as one complete JSON document.
///
/// Returns `None` while the buffer is not (yet) a document: invalid or
/// truncated UTF-8, a truncated document, or anything that fails to parse.
/// None of these are errors while more bytes may still arrive.
pub fn decode_document(buf: &[u8]) -> Option<Value> {
    if !may_end_document(buf) {
        return None;
    }
    let text = std::str::from_utf8(buf).ok()?;
    serde_json::from_str(text).ok()
}

/// Whether the last non-whitespace byte can close a JSON document.
///
/// Documents end in `}`, `]`, `"`, a digit, or the last letter of
/// `true`/`false`/`null`. Anything else cannot parse, so the full parse is
/// skipped for it.
fn may_end_document(buf: &[u8]) -> bool {
    match buf.iter().rev().find(|b| !b.is_ascii_whitespace()) {
        Some(b'}' | b']' | b'"') => true,
        Some(b) => b.is_ascii_alphanumeric(),
        None => false,
    }
}

/// Configuration for reading responses.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Bytes requested per read. Default: 4 KiB.
    pub chunk_size: usize,
    /// Overall deadline for one response. Default: 30s.
    pub receive_timeout: Duration,
    /// Maximum accumulated response size. Default: 64 MiB.
    pub max_document_size: usize,
    /// Write timeout for the request. `None` blocks.
    pub write_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            max_document_size: DEFAULT_MAX_DOCUMENT_SIZE,
            write_timeout: None,
        }
    }
}

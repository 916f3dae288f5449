use std::time::Duration;

use cmdwire_transport::TransportError;

/// Errors that can occur while encoding requests or assembling responses.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The peer closed the connection before sending a single byte.
    #[error("connection closed before any data was received")]
    ClosedBeforeData,

    /// The peer closed the connection mid-document.
    #[error("connection closed with {received} bytes that do not form a JSON document")]
    Incomplete { received: usize },

    /// The receive deadline elapsed without a parseable document.
    #[error("no complete JSON document after {elapsed:?} ({received} bytes received)")]
    TimeoutNoValidFrame { received: usize, elapsed: Duration },

    /// The accumulated response exceeds the configured maximum size.
    #[error("response too large ({size} bytes, max {max})")]
    DocumentTooLarge { size: usize, max: usize },

    /// The request envelope is not well formed.
    #[error("invalid command envelope: {0}")]
    InvalidEnvelope(String),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O error occurred while reading or writing.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream accepted zero bytes of a request write.
    #[error("connection closed while writing request")]
    ConnectionClosed,
}

impl FrameError {
    /// Bytes received before the failure, for framing failures.
    pub fn received(&self) -> Option<usize> {
        match self {
            FrameError::ClosedBeforeData => Some(0),
            FrameError::Incomplete { received }
            | FrameError::TimeoutNoValidFrame { received, .. } => Some(*received),
            FrameError::DocumentTooLarge { size, .. } => Some(*size),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;

pub(crate) fn transport_to_io(err: TransportError) -> std::io::Error {
    match err {
        TransportError::Io(io) | TransportError::Accept(io) => io,
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::SocketOption { source, .. } => source,
        other => std::io::Error::other(other.to_string()),
    }
}

use std::time::Duration;

use cmdwire_frame::FrameError;
use cmdwire_transport::TransportError;

/// Errors that can occur while exchanging a command with the peer.
///
/// Application-level failures reported by the peer are not errors here;
/// they come back as [`Response::Err`](crate::Response::Err).
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The peer could not be reached (not running, wrong port, refused).
    #[error("peer unavailable at {addr}: {source}")]
    Unavailable {
        addr: String,
        source: TransportError,
    },

    /// The peer accepted the connection and closed it without replying.
    #[error("peer closed the connection before sending any data")]
    ClosedBeforeData,

    /// No parseable response arrived before the receive deadline.
    #[error("no complete response after {elapsed:?} ({received} bytes received)")]
    Timeout { received: usize, elapsed: Duration },

    /// The peer closed the connection mid-response.
    #[error("response ended after {received} bytes without a complete JSON document")]
    Incomplete { received: usize },

    /// Transport-level error after the connection was established.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error (envelope encoding, oversized response, I/O).
    #[error("frame error: {0}")]
    Frame(FrameError),

    /// The params were rejected by the schema registry.
    #[cfg(feature = "schema")]
    #[error("schema validation error: {0}")]
    Schema(#[from] cmdwire_schema::SchemaError),
}

impl ChannelError {
    /// True when the peer is not there to answer, as opposed to answering
    /// badly.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ChannelError::Unavailable { .. } | ChannelError::ClosedBeforeData
        )
    }

    /// True when the receive deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ChannelError::Timeout { .. })
    }

    /// Bytes received before a framing failure.
    pub fn received(&self) -> Option<usize> {
        match self {
            ChannelError::ClosedBeforeData => Some(0),
            ChannelError::Timeout { received, .. } | ChannelError::Incomplete { received } => {
                Some(*received)
            }
            ChannelError::Frame(err) => err.received(),
            _ => None,
        }
    }
}

impl From<FrameError> for ChannelError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::ClosedBeforeData => ChannelError::ClosedBeforeData,
            FrameError::TimeoutNoValidFrame { received, elapsed } => {
                ChannelError::Timeout { received, elapsed }
            }
            FrameError::Incomplete { received } => ChannelError::Incomplete { received },
            other => ChannelError::Frame(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;

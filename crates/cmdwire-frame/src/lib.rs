//! Command envelopes and JSON-completion framing.
//!
//! The peer speaks raw JSON over TCP with no length prefix and no
//! delimiter:
//! - requests are a single `{"type": ..., "params": {...}}` object
//! - a response is complete once the received bytes parse as one JSON
//!   document, or when the peer closes the connection
//!
//! [`FrameReader`] hides the partial reads and split UTF-8 sequences this
//! implies; callers always get a whole parsed document.

pub mod codec;
pub mod envelope;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_document, Frame, FrameConfig, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_DOCUMENT_SIZE,
    DEFAULT_RECEIVE_TIMEOUT,
};
pub use envelope::CommandEnvelope;
pub use error::{FrameError, Result};
pub use reader::{FrameReader, TimedRead};
pub use writer::FrameWriter;

use std::io::{Cursor, ErrorKind, Read};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use cmdwire_transport::CommandStream;
use tracing::{debug, trace};

use crate::codec::{decode_document, Frame, FrameConfig};
use crate::error::{transport_to_io, FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// A readable stream whose per-read timeout can be adjusted.
///
/// The reader shrinks the timeout before every read so the whole response
/// stays inside one receive deadline. Streams without timeouts keep the
/// no-op default.
pub trait TimedRead: Read {
    fn set_read_timeout(&mut self, _timeout: Option<Duration>) -> std::io::Result<()> {
        Ok(())
    }
}

impl TimedRead for CommandStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> std::io::Result<()> {
        CommandStream::set_read_timeout(self, timeout).map_err(transport_to_io)
    }
}

impl TimedRead for TcpStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> std::io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }
}

impl<T: AsRef<[u8]>> TimedRead for Cursor<T> {}

impl TimedRead for &[u8] {}

/// Reads one complete JSON document from a stream.
///
/// There is no length prefix: a response is complete as soon as the bytes
/// received so far parse as JSON. This is a compatibility shim for peers
/// that write raw JSON and close. A document that happens to parse before
/// the peer has finished writing is accepted early.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: TimedRead> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete document (blocking, bounded by the receive
    /// deadline).
    ///
    /// - `ClosedBeforeData` if the peer closes before sending anything
    /// - `Incomplete` if the peer closes mid-document
    /// - `TimeoutNoValidFrame` if the deadline passes and the partial buffer
    ///   does not parse
    pub fn read_frame(&mut self) -> Result<Frame> {
        let started = Instant::now();
        let deadline = started + self.config.receive_timeout;
        let mut chunk = vec![0u8; self.config.chunk_size.max(1)];
        self.buf.clear();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return self.finish_on_timeout(started.elapsed());
            }
            self.inner.set_read_timeout(Some(remaining))?;

            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_reset(&err) => {
                    debug!(error = %err, "connection reset by peer");
                    return self.finish_on_eof();
                }
                Err(err) if is_timeout(&err) => {
                    return self.finish_on_timeout(started.elapsed());
                }
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return self.finish_on_eof();
            }

            let size = self.buf.len() + read;
            if size > self.config.max_document_size {
                return Err(FrameError::DocumentTooLarge {
                    size,
                    max: self.config.max_document_size,
                });
            }
            self.buf.extend_from_slice(&chunk[..read]);
            trace!(read, total = self.buf.len(), "received chunk");

            if Instant::now() >= deadline {
                return self.finish_on_timeout(started.elapsed());
            }
            if let Some(value) = decode_document(&self.buf) {
                return Ok(self.take_frame(value));
            }
        }
    }

    fn finish_on_eof(&mut self) -> Result<Frame> {
        if self.buf.is_empty() {
            return Err(FrameError::ClosedBeforeData);
        }
        match decode_document(&self.buf) {
            Some(value) => Ok(self.take_frame(value)),
            None => Err(FrameError::Incomplete {
                received: self.buf.len(),
            }),
        }
    }

    fn finish_on_timeout(&mut self, elapsed: Duration) -> Result<Frame> {
        let received = self.buf.len();
        if received > 0 {
            if let Some(value) = decode_document(&self.buf) {
                debug!(received, "accepting partial buffer at receive deadline");
                return Ok(self.take_frame(value));
            }
        }
        Err(FrameError::TimeoutNoValidFrame { received, elapsed })
    }

    fn take_frame(&mut self, value: serde_json::Value) -> Frame {
        let payload = self.buf.split().freeze();
        debug!(size = payload.len(), "received complete document");
        Frame::new(payload, value)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

/// A reset is the peer closing with our request still unread on its side.
fn is_reset(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
    )
}

use std::io::{ErrorKind, Write};

use cmdwire_transport::CommandStream;
use tracing::debug;

use crate::codec::FrameConfig;
use crate::envelope::CommandEnvelope;
use crate::error::{transport_to_io, FrameError, Result};

/// Writes requests (and, on the listening side, responses) as raw JSON.
///
/// Nothing is added around the document: no length, no newline.
pub struct FrameWriter<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Encode and send one command envelope. Returns the bytes written.
    pub fn send(&mut self, envelope: &CommandEnvelope) -> Result<usize> {
        let wire = envelope.encode()?;
        self.write_document(&wire)?;
        debug!(command = %envelope.name, size = wire.len(), "sent command");
        Ok(wire.len())
    }

    /// Serialize any value and send it as one document.
    pub fn send_value(&mut self, value: &serde_json::Value) -> Result<usize> {
        let wire = serde_json::to_vec(value)?;
        self.write_document(&wire)?;
        Ok(wire.len())
    }

    /// Write an already-encoded document.
    pub fn write_document(&mut self, document: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < document.len() {
            match self.inner.write(&document[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<CommandStream> {
    /// Create a frame writer for `CommandStream` and apply the write timeout.
    pub fn with_config_stream(inner: CommandStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(|err| FrameError::Io(transport_to_io(err)))?;
        Ok(Self::with_config(inner, config))
    }
}

use std::io::ErrorKind;
use std::time::{Duration, Instant};

use cmdwire_frame::{CommandEnvelope, FrameError, FrameReader, FrameWriter};
use cmdwire_transport::{connect, CommandStream};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::ChannelConfig;
use crate::error::{ChannelError, Result};
use crate::response::{normalize, Response};

#[cfg(feature = "schema")]
type SchemaRegistryHandle = std::sync::Arc<cmdwire_schema::SchemaRegistry>;

/// Connection state of a [`Channel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

/// Owns the socket for one command exchange at a time.
///
/// The peer closes its side after every response and does not accept a
/// second command on the same connection, so every [`send`](Self::send)
/// opens a fresh socket and closes it before returning. `&mut self` keeps
/// at most one command in flight per channel.
pub struct Channel {
    config: ChannelConfig,
    stream: Option<CommandStream>,
    state: ChannelState,
    connections_opened: u64,
    #[cfg(feature = "schema")]
    schema_registry: Option<SchemaRegistryHandle>,
}

impl Channel {
    /// Create a channel. Nothing is connected until the first send.
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            stream: None,
            state: ChannelState::Disconnected,
            connections_opened: 0,
            #[cfg(feature = "schema")]
            schema_registry: None,
        }
    }

    /// Validate params against this registry before every send.
    #[cfg(feature = "schema")]
    pub fn with_schema_registry(mut self, registry: SchemaRegistryHandle) -> Self {
        self.schema_registry = Some(registry);
        self
    }

    /// Run one command and return the normalized response.
    ///
    /// A failure reported by the peer is `Ok(Response::Err { .. })`. An
    /// `Err` means the exchange itself failed; check
    /// [`ChannelError::is_unavailable`] to tell "peer not running" apart
    /// from a broken exchange.
    pub fn send(&mut self, name: &str, params: Map<String, Value>) -> Result<Response> {
        self.send_envelope(&CommandEnvelope::new(name, params))
    }

    /// Like [`send`](Self::send), taking params as any JSON value (`null`
    /// means no params).
    pub fn send_value(&mut self, name: &str, params: Value) -> Result<Response> {
        let envelope = CommandEnvelope::from_value(name, params)?;
        self.send_envelope(&envelope)
    }

    /// Send a prepared envelope.
    pub fn send_envelope(&mut self, envelope: &CommandEnvelope) -> Result<Response> {
        let wire = envelope.encode()?;
        #[cfg(feature = "schema")]
        if let Some(registry) = &self.schema_registry {
            registry.validate_envelope(envelope)?;
        }

        self.close();
        let started = Instant::now();
        let result = self.exchange(&envelope.name, &wire);
        self.close();

        match &result {
            Ok(response) => debug!(
                command = %envelope.name,
                success = ?response.success(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "command completed"
            ),
            Err(err) => warn!(command = %envelope.name, error = %err, "command failed"),
        }
        result
    }

    /// Open and close a connection without sending anything.
    ///
    /// Returns the connect latency. Useful as a reachability check; the
    /// peer sees an empty connection.
    pub fn probe(&mut self) -> Result<Duration> {
        self.close();
        let started = Instant::now();
        self.open()?;
        let latency = started.elapsed();
        self.close();
        Ok(latency)
    }

    fn exchange(&mut self, command: &str, wire: &[u8]) -> Result<Response> {
        let stream = self.open()?;
        let reader_stream = stream.try_clone()?;
        let writer_stream = stream.try_clone()?;

        let mut writer = FrameWriter::with_config_stream(writer_stream, self.config.frame.clone())?;
        writer.write_document(wire).map_err(write_error)?;
        debug!(command, size = wire.len(), "sent command");

        let mut reader = FrameReader::with_config(reader_stream, self.config.frame.clone());
        let frame = reader.read_frame()?;
        Ok(normalize(frame.into_value()))
    }

    fn open(&mut self) -> Result<&CommandStream> {
        self.state = ChannelState::Connecting;
        let stream = connect(
            &self.config.endpoint,
            self.config.connect_timeout,
            &self.config.socket,
        )
        .map_err(|source| {
            self.state = ChannelState::Disconnected;
            ChannelError::Unavailable {
                addr: self.config.endpoint.to_string(),
                source,
            }
        })?;

        self.connections_opened += 1;
        self.state = ChannelState::Connected;
        let stream: &CommandStream = self.stream.insert(stream);
        Ok(stream)
    }

    /// Close the current socket, if any.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.close();
        }
        self.state = ChannelState::Disconnected;
    }

    /// Current connection state. `Disconnected` between commands.
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Number of sockets this channel has opened.
    pub fn connections_opened(&self) -> u64 {
        self.connections_opened
    }

    /// Channel configuration.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }
}

/// A peer that hangs up while the request is still going out has sent
/// nothing back.
fn write_error(err: FrameError) -> ChannelError {
    match err {
        FrameError::ConnectionClosed => ChannelError::ClosedBeforeData,
        FrameError::Io(io)
            if matches!(
                io.kind(),
                ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe
            ) =>
        {
            debug!(error = %io, "peer closed while the command was being written");
            ChannelError::ClosedBeforeData
        }
        other => other.into(),
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("endpoint", &self.config.endpoint)
            .field("state", &self.state)
            .field("connections_opened", &self.connections_opened)
            .finish()
    }
}

use std::fmt;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::options::SocketOptions;
use crate::stream::CommandStream;

/// Default peer host.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default peer port.
pub const DEFAULT_PORT: u16 = 6400;
/// Default connect timeout: 5 seconds.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Host/port pair identifying a listening peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Resolve to the first socket address.
    pub fn resolve(&self) -> Result<SocketAddr> {
        let mut addrs = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|source| TransportError::Connect {
                addr: self.to_string(),
                source,
            })?;
        addrs
            .next()
            .ok_or_else(|| TransportError::Unresolved(self.to_string()))
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

/// Open a new command stream (blocking, bounded by `timeout`).
pub fn connect(
    endpoint: &Endpoint,
    timeout: Duration,
    options: &SocketOptions,
) -> Result<CommandStream> {
    let addr = endpoint.resolve()?;
    let stream =
        TcpStream::connect_timeout(&addr, timeout).map_err(|source| TransportError::Connect {
            addr: endpoint.to_string(),
            source,
        })?;
    options.apply(&stream)?;
    debug!(%addr, "connected to peer");
    Ok(CommandStream::from_tcp(stream))
}

/// Passive side of a command exchange.
///
/// Accepts one connection per command, mirroring the peer this transport
/// talks to. Used by integration tests and the `respond` mock peer.
pub struct LoopbackListener {
    listener: TcpListener,
    addr: SocketAddr,
}

impl LoopbackListener {
    /// Bind and listen. Port 0 picks an ephemeral port.
    pub fn bind(endpoint: &Endpoint) -> Result<Self> {
        let addr = endpoint.resolve()?;
        let listener = TcpListener::bind(addr).map_err(|source| TransportError::Bind {
            addr: endpoint.to_string(),
            source,
        })?;
        let addr = listener.local_addr()?;
        info!(%addr, "listening for commands");
        Ok(Self { listener, addr })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<(CommandStream, SocketAddr)> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%peer, "accepted connection");
        Ok((CommandStream::from_tcp(stream), peer))
    }

    /// Toggle non-blocking accept.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.listener
            .set_nonblocking(nonblocking)
            .map_err(Into::into)
    }

    /// The bound address (with the resolved ephemeral port).
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// The bound address as an endpoint clients can connect to.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::from(self.addr)
    }
}

//! Loopback TCP transport for command/response exchanges.
//!
//! Provides the connection primitives the rest of cmdwire builds on:
//! - [`connect`] opens a [`CommandStream`] with a connect timeout and the
//!   socket options the peer expects (no Nagle, keep-alive, 64 KiB buffers)
//! - [`LoopbackListener`] is the passive side, used by tests and mock peers
//!
//! This is the lowest layer of cmdwire. Every exchange uses a fresh stream;
//! nothing here pools or reuses connections.

pub mod error;
pub mod options;
pub mod stream;
pub mod tcp;

pub use error::{Result, TransportError};
pub use options::{SocketOptions, DEFAULT_SOCKET_BUFFER_SIZE};
pub use stream::CommandStream;
pub use tcp::{
    connect, Endpoint, LoopbackListener, DEFAULT_CONNECT_TIMEOUT, DEFAULT_HOST, DEFAULT_PORT,
};

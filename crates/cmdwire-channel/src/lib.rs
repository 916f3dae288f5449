//! Command channel to a passively-listening peer.
//!
//! This is the layer callers use. One call, one connection:
//! [`Channel::send`] opens a socket, writes the command envelope, reads one
//! JSON document and normalizes whatever shape the peer answered with into
//! a [`Response`].

pub mod channel;
pub mod config;
pub mod error;
pub mod handle;
pub mod response;

#[cfg(test)]
pub(crate) mod test_peer;

pub use channel::{Channel, ChannelState};
pub use config::ChannelConfig;
pub use error::{ChannelError, Result};
pub use handle::ChannelHandle;
pub use response::{normalize, Response};

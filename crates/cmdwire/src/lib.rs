//! Command/response transport for a loopback peer that closes the
//! connection after every reply.
//!
//! cmdwire sends `{"type": name, "params": {...}}` over a fresh TCP
//! connection per command, reads back one JSON document (the peer uses no
//! length prefix or delimiter) and normalizes the peer's response shapes
//! into a single [`Response`](channel::Response).
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP connect/listen with socket options applied
//! - [`frame`]: Command envelope, parse-until-complete reader, writer
//! - [`schema`]: Optional JSON Schema validation of params (behind `schema` feature)
//! - [`channel`]: Reconnect-per-command channel and shared handle (behind `channel` feature)

/// Re-export transport types.
pub mod transport {
    pub use cmdwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use cmdwire_frame::*;
}

/// Re-export schema types (requires `schema` feature).
#[cfg(feature = "schema")]
pub mod schema {
    pub use cmdwire_schema::*;
}

/// Re-export channel types (requires `channel` feature).
#[cfg(feature = "channel")]
pub mod channel {
    pub use cmdwire_channel::*;
}

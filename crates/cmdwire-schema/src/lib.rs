//! Optional JSON Schema validation of command parameters.
//!
//! Validate `params` against a per-command JSON Schema (2020-12) before the
//! envelope leaves the process. A malformed call fails locally with a
//! readable message instead of round-tripping to the peer.
//!
//! This crate is optional. Enable the `schema` feature of `cmdwire-channel`
//! to have every `Channel::send` validate against a registry.

pub mod config;
pub mod error;
pub mod registry;
pub mod validator;

pub use config::RegistryConfig;
pub use error::{Result, SchemaError};
pub use registry::SchemaRegistry;

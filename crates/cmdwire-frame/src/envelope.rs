use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FrameError, Result};

/// Wire wrapper for one command: `{"type": name, "params": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Command name understood by the peer.
    #[serde(rename = "type")]
    pub name: String,
    /// Command-specific parameters.
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl CommandEnvelope {
    /// Build an envelope from a parameter map.
    pub fn new(name: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Build an envelope from an arbitrary JSON value.
    ///
    /// `null` becomes an empty map; any other non-object is rejected.
    pub fn from_value(name: impl Into<String>, params: Value) -> Result<Self> {
        let params = match params {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                return Err(FrameError::InvalidEnvelope(format!(
                    "params must be a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };
        Ok(Self::new(name, params))
    }

    /// Serialize to the wire form.
    pub fn encode(&self) -> Result<Bytes> {
        if self.name.trim().is_empty() {
            return Err(FrameError::InvalidEnvelope(
                "command name must not be empty".to_string(),
            ));
        }
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Parse a received request (used on the listening side).
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let envelope: Self = serde_json::from_slice(payload)?;
        if envelope.name.trim().is_empty() {
            return Err(FrameError::InvalidEnvelope(
                "command name must not be empty".to_string(),
            ));
        }
        Ok(envelope)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

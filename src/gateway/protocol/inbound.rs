//! Client to relay wire messages
//!
//! Three shapes arrive on the socket:
//!
//! - `{"parts": [{"mime_type": ..., "data": ...}, ...]}` ordered multi-part message
//! - `{"mime_type": ..., "data": ...}` legacy single frame
//! - the literal text `client_ready`, accepted and never forwarded

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Sentinel a client sends once its UI is ready
pub const CLIENT_READY: &str = "client_ready";

/// One part of a client message, still in transport encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPart {
    pub mime_type: String,
    pub data: String,
}

impl ClientPart {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        ClientPart {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Read a part from a loosely-typed JSON value. Non-string `data` is
    /// taken in its JSON text form.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::Decode(format!("part is not an object: {}", value)))?;

        let mime_type = object
            .get("mime_type")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| Error::Decode("part is missing mime_type".to_string()))?;

        let data = match object.get("data") {
            None | Some(Value::Null) => {
                return Err(Error::Decode(format!("part {} is missing data", mime_type)))
            }
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };

        Ok(ClientPart::new(mime_type, data))
    }
}

/// A parsed client message
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// The readiness sentinel
    Ready,
    /// Multi-part message; parts are validated one by one downstream
    Composite(Vec<Value>),
    /// Legacy single frame
    SingleFrame(ClientPart),
}

impl ClientMessage {
    /// Parse one text frame
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim() == CLIENT_READY {
            return Ok(ClientMessage::Ready);
        }

        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::Decode(format!("invalid JSON envelope: {}", e)))?;

        match value {
            Value::String(s) if s == CLIENT_READY => Ok(ClientMessage::Ready),
            Value::Object(mut object) => {
                if let Some(parts) = object.remove("parts") {
                    return match parts {
                        Value::Array(parts) if !parts.is_empty() => {
                            Ok(ClientMessage::Composite(parts))
                        }
                        other => Err(Error::Decode(format!(
                            "'parts' must be a non-empty list, got {}",
                            other
                        ))),
                    };
                }

                if object.contains_key("mime_type") {
                    let part = ClientPart::from_value(&Value::Object(object))?;
                    if part.mime_type == crate::agent::TEXT_PLAIN && part.data == CLIENT_READY {
                        return Ok(ClientMessage::Ready);
                    }
                    return Ok(ClientMessage::SingleFrame(part));
                }

                Err(Error::Decode(
                    "unknown message structure (no 'parts' or 'mime_type')".to_string(),
                ))
            }
            other => Err(Error::Decode(format!("unexpected message: {}", other))),
        }
    }
}

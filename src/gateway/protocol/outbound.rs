//! Relay to client wire messages

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every frame the relay writes to the client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireMessage {
    /// `{"turn_complete": .., "interrupted": .., "interaction_completed": ..}`
    Status(StatusFrame),
    /// `{"mime_type": "text/plain" | "audio/pcm", "data": ..}`
    Media(MediaFrame),
    /// `{"type": "command" | "ui_command", "command_name": .., "payload": ..}`
    Command(CommandFrame),
    /// `{"error": .., "type": "RuntimeError" | "ServerError"}`
    Error(ErrorFrame),
    /// Object sent exactly as given
    Raw(Value),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFrame {
    pub turn_complete: bool,
    pub interrupted: bool,
    pub interaction_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFrame {
    pub mime_type: String,
    pub data: String,
}

/// Envelope type of a command frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Command,
    UiCommand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandFrame {
    #[serde(rename = "type")]
    pub kind: CommandKind,
    pub command_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Error class reported to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Session or engine setup failed
    RuntimeError,
    /// Unhandled fault while relaying
    ServerError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub error: String,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
}

/// Message shown to clients for unhandled faults
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error.";

impl WireMessage {
    pub fn status(turn_complete: bool, interrupted: bool, interaction_completed: bool) -> Self {
        WireMessage::Status(StatusFrame {
            turn_complete,
            interrupted,
            interaction_completed,
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        WireMessage::Media(MediaFrame {
            mime_type: crate::agent::TEXT_PLAIN.to_string(),
            data: text.into(),
        })
    }

    /// Audio frame carrying already base64-encoded PCM
    pub fn audio(encoded: impl Into<String>) -> Self {
        WireMessage::Media(MediaFrame {
            mime_type: crate::agent::PCM_AUDIO.to_string(),
            data: encoded.into(),
        })
    }

    pub fn command(command_name: impl Into<String>, payload: Option<Value>) -> Self {
        WireMessage::Command(CommandFrame {
            kind: CommandKind::Command,
            command_name: command_name.into(),
            payload,
        })
    }

    pub fn ui_command(command_name: impl Into<String>, payload: Value) -> Self {
        WireMessage::Command(CommandFrame {
            kind: CommandKind::UiCommand,
            command_name: command_name.into(),
            payload: Some(payload),
        })
    }

    pub fn runtime_error(message: impl Into<String>) -> Self {
        WireMessage::Error(ErrorFrame {
            error: message.into(),
            kind: ErrorKind::RuntimeError,
        })
    }

    pub fn server_error() -> Self {
        WireMessage::Error(ErrorFrame {
            error: INTERNAL_ERROR_MESSAGE.to_string(),
            kind: ErrorKind::ServerError,
        })
    }

    /// Serialize to the JSON text sent on the socket
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

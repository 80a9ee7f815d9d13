//! Type definitions for the agent engine boundary

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque binary payload tagged with its mime type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Declared mime type (e.g. `audio/pcm`, `image/png`)
    pub mime_type: String,
    /// Raw bytes, already decoded from the transport encoding
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Blob {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Whether this blob carries raw PCM audio
    pub fn is_pcm_audio(&self) -> bool {
        self.mime_type == PCM_AUDIO
    }
}

/// Mime type used for realtime audio in both directions
pub const PCM_AUDIO: &str = "audio/pcm";

/// Mime type for literal text parts
pub const TEXT_PLAIN: &str = "text/plain";

/// One typed part of an agent input event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputPart {
    /// Literal text
    Text(String),
    /// Decoded binary payload
    Binary(Blob),
}

impl InputPart {
    pub fn text(text: impl Into<String>) -> Self {
        InputPart::Text(text.into())
    }
}

/// An ordered list of parts assembled from one client message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentInput {
    pub parts: Vec<InputPart>,
}

impl AgentInput {
    pub fn new(parts: Vec<InputPart>) -> Self {
        AgentInput { parts }
    }

    /// Single text part input
    pub fn from_text(text: impl Into<String>) -> Self {
        AgentInput {
            parts: vec![InputPart::text(text)],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Items carried on the engine's input channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveInput {
    /// Discrete turn content
    Content(AgentInput),
    /// Continuous realtime media (audio)
    Realtime(Blob),
    /// Client side is finished; the engine should wind the conversation down
    Close,
}

/// The request an engine is about to dispatch to its model for one turn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelRequest {
    /// Conversation contents sent with this turn, oldest first
    pub contents: Vec<AgentInput>,
}

impl ModelRequest {
    pub fn new(contents: Vec<AgentInput>) -> Self {
        ModelRequest { contents }
    }

    /// Iterate mutably over every text-bearing part of every content
    pub fn text_parts_mut(&mut self) -> impl Iterator<Item = &mut String> {
        self.contents
            .iter_mut()
            .flat_map(|content| content.parts.iter_mut())
            .filter_map(|part| match part {
                InputPart::Text(text) => Some(text),
                InputPart::Binary(_) => None,
            })
    }
}

/// Response modality negotiated for the conversation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    #[default]
    Text,
    Audio,
}

impl Modality {
    pub fn from_audio_flag(is_audio: bool) -> Self {
        if is_audio {
            Modality::Audio
        } else {
            Modality::Text
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modality::Text => write!(f, "TEXT"),
            Modality::Audio => write!(f, "AUDIO"),
        }
    }
}

/// Result of a tool call reported back by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResponse {
    /// Tool name
    pub name: String,
    /// Tool result object
    pub response: Value,
}

/// One part of an engine output event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnginePart {
    pub text: Option<String>,
    pub inline_data: Option<Blob>,
    pub function_response: Option<FunctionResponse>,
}

impl EnginePart {
    pub fn text(text: impl Into<String>) -> Self {
        EnginePart {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn inline_data(blob: Blob) -> Self {
        EnginePart {
            inline_data: Some(blob),
            ..Default::default()
        }
    }

    pub fn function_response(name: impl Into<String>, response: Value) -> Self {
        EnginePart {
            function_response: Some(FunctionResponse {
                name: name.into(),
                response,
            }),
            ..Default::default()
        }
    }
}

/// Content attached to an engine output event
#[derive(Debug, Clone, PartialEq)]
pub enum EventContent {
    /// A structured object emitted directly by the engine
    Structured(Map<String, Value>),
    /// Ordered model output parts
    Parts(Vec<EnginePart>),
}

/// A raw output event as produced by the agent engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineEvent {
    pub turn_complete: bool,
    pub interrupted: bool,
    pub interaction_completed: bool,
    pub content: Option<EventContent>,
}

impl EngineEvent {
    /// Event signalling the end of a turn
    pub fn turn_complete() -> Self {
        EngineEvent {
            turn_complete: true,
            ..Default::default()
        }
    }

    pub fn interrupted() -> Self {
        EngineEvent {
            interrupted: true,
            ..Default::default()
        }
    }

    pub fn with_parts(parts: Vec<EnginePart>) -> Self {
        EngineEvent {
            content: Some(EventContent::Parts(parts)),
            ..Default::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::with_parts(vec![EnginePart::text(text)])
    }

    /// Structured event; non-object values carry no structured content
    pub fn structured(value: Value) -> Self {
        EngineEvent {
            content: match value {
                Value::Object(map) => Some(EventContent::Structured(map)),
                _ => None,
            },
            ..Default::default()
        }
    }

    pub fn has_status_flags(&self) -> bool {
        self.turn_complete || self.interrupted || self.interaction_completed
    }

    /// First part of a parts-bearing event
    pub fn first_part(&self) -> Option<&EnginePart> {
        match &self.content {
            Some(EventContent::Parts(parts)) => parts.first(),
            _ => None,
        }
    }
}

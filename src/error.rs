//! Error types for the storefront relay

use thiserror::Error;

/// Result type alias using the relay's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the relay
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Agent engine unavailable or faulted
    #[error("Agent engine error: {0}")]
    Engine(String),

    /// WebSocket send/receive failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed client envelope or transport encoding
    #[error("Decode error: {0}")]
    Decode(String),

    /// Tool execution error
    #[error("Tool error: {0}")]
    Tool(String),

    /// Session setup or lookup error
    #[error("Session error: {0}")]
    Session(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if the error ends the session before any pump starts
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(self, Error::Engine(_) | Error::Session(_))
    }

    /// Check if error is a client error (malformed input, never fatal)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Decode(_))
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<axum::Error> for Error {
    fn from(err: axum::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

//! Relay wire protocol
//!
//! JSON text frames in both directions:
//!
//! - `inbound`: client messages (multi-part, legacy single frame, ready sentinel)
//! - `outbound`: status, text, audio, command and error frames

pub mod inbound;
pub mod outbound;

pub use inbound::{ClientMessage, ClientPart, CLIENT_READY};
pub use outbound::{
    CommandFrame, CommandKind, ErrorFrame, ErrorKind, MediaFrame, StatusFrame, WireMessage,
    INTERNAL_ERROR_MESSAGE,
};

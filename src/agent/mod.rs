//! Agent module - conversational engine boundary
//!
//! This module defines how the relay talks to an agent engine:
//! - Input events assembled from client messages and the input queue
//! - Raw engine output events and their content parts
//! - The `TurnHooks` interception points (before request, tool call)
//! - A loopback engine for local runs and tests

mod engine;
mod loopback;
mod types;

pub use engine::{
    input_channel, AgentEngine, EventStream, InputQueue, InputReceiver, OpenConversation,
    TurnHooks,
};
pub use loopback::LoopbackEngine;
pub use types::*;

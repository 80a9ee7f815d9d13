//! Gateway module - the client-facing HTTP/WebSocket surface
//!
//! ```text
//! ┌──────────┐  /ws/agent_stream/{id}  ┌─────────┐  input / events  ┌──────────────┐
//! │  Client  │ ◄─────────────────────► │  Relay  │ ◄──────────────► │ Agent engine │
//! └──────────┘     JSON text frames    └─────────┘                  └──────────────┘
//! ```

pub mod protocol;
pub mod server;

pub use protocol::{ClientMessage, ClientPart, WireMessage};
pub use server::{router, serve, serve_on, AppState};

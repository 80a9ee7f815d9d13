//! Relay module - per-session pumps between a client socket and the engine
//!
//! - **session**: typed per-session state and the in-memory session store
//! - **rate_gate**: sanitizes and throttles model requests, releases deferred commands
//! - **classifier**: normalizes engine events by a fixed priority table
//! - **inbound** / **outbound**: the two pumps
//! - **hooks**: the `TurnHooks` installed on each conversation
//! - **lifecycle**: supervision, cancellation and teardown

mod classifier;
mod hooks;
mod inbound;
mod lifecycle;
mod outbound;
mod rate_gate;
mod session;

pub use classifier::{classify, Category, OutboundEvent, PRIORITY};
pub use hooks::SessionHooks;
pub use inbound::{assemble_parts, run_inbound, translate, InboundAction};
pub use lifecycle::{run_session, ConnectParams, RelayContext, SessionOutcome};
pub use outbound::{deferred_frame, run_outbound, send_wire, to_wire, LEGACY_SHIPPING_COMMAND};
pub use rate_gate::{sanitize, Admission, RateGate, RateState, EMPTY_TEXT_PLACEHOLDER};
pub use session::{Session, SessionStore};

/// Why a pump stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpExit {
    /// Its source ran dry (engine stream ended, or input no longer accepted)
    EndOfStream,
    /// The client went away
    Disconnected,
    /// Its sibling finished first
    Cancelled,
}

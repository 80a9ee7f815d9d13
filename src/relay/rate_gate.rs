//! Rate gate - per-session throttle in front of the agent engine
//!
//! Runs once per model request. Empty text parts are replaced with a single
//! space, the request is counted against a fixed window and, once the quota
//! is spent, the calling turn sleeps until the window has passed. The sleep
//! runs inside the engine's turn and is not interrupted by a disconnect.
//!
//! A window starts on the first request ever and again after every request
//! that had to wait. Nothing else resets the count.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use super::session::Session;
use crate::agent::ModelRequest;
use crate::config::RelayConfig;
use crate::tools::UiCommand;

/// Text substituted for empty text parts
pub const EMPTY_TEXT_PLACEHOLDER: &str = " ";

/// Fixed-window counter owned by one session
#[derive(Debug, Clone, Default)]
pub struct RateState {
    /// Start of the current window; `None` before the first request
    pub window_start: Option<Instant>,
    /// Requests admitted in the current window
    pub request_count: u32,
}

/// The gate's verdict for one request
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    /// Request count after admission
    pub count: u32,
    /// How long the request was held back
    pub waited: Duration,
    /// Deferred UI command removed from the session for this turn
    pub deferred: Option<UiCommand>,
}

/// Window length and quota
#[derive(Debug, Clone, Copy)]
pub struct RateGate {
    window: Duration,
    quota: u32,
}

impl RateGate {
    pub fn new(window: Duration, quota: u32) -> Self {
        RateGate { window, quota }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(config.rate_window, config.rate_quota)
    }

    /// Sanitize, throttle and hand off any deferred command
    pub async fn admit(&self, session: &Session, request: &mut ModelRequest) -> Admission {
        let replaced = sanitize(request);
        if replaced > 0 {
            debug!(session_id = %session.id(), replaced, "Replaced empty text parts");
        }

        let (count, waited) = self.throttle(session.rate_state()).await;
        debug!(session_id = %session.id(), count, waited_ms = waited.as_millis() as u64, "Request admitted");

        let deferred = session.take_deferred().await;
        if let Some(command) = &deferred {
            info!(session_id = %session.id(), ui_element = %command.ui_element, "Handing off deferred UI command");
        }

        Admission {
            count,
            waited,
            deferred,
        }
    }

    /// Count one request against `state`, sleeping if the quota is spent.
    /// Returns the admitted count and the time spent waiting.
    pub async fn throttle(&self, state: &Mutex<RateState>) -> (u32, Duration) {
        let mut state = state.lock().await;
        let now = Instant::now();

        let Some(window_start) = state.window_start else {
            state.window_start = Some(now);
            state.request_count = 1;
            return (1, Duration::ZERO);
        };

        let count = state.request_count + 1;
        if count <= self.quota {
            state.request_count = count;
            return (count, Duration::ZERO);
        }

        let elapsed = now.duration_since(window_start);
        let delay = (self.window + Duration::from_secs(1)).saturating_sub(elapsed);
        if !delay.is_zero() {
            info!(count, delay_ms = delay.as_millis() as u64, "Rate quota exhausted, waiting");
            tokio::time::sleep(delay).await;
        }

        state.window_start = Some(now);
        state.request_count = 1;
        (1, delay)
    }
}

/// Replace empty text parts with the placeholder; returns how many changed
pub fn sanitize(request: &mut ModelRequest) -> usize {
    let mut replaced = 0;
    for text in request.text_parts_mut() {
        if text.is_empty() {
            *text = EMPTY_TEXT_PLACEHOLDER.to_string();
            replaced += 1;
        }
    }
    replaced
}

//! Session lifecycle controller
//!
//! Resolves the session, opens the engine conversation, runs both pumps and
//! tears the connection down. The first pump to finish cancels its sibling,
//! which gets the configured grace period before it is aborted. The socket is
//! closed exactly once, after both pumps are done.

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::{close_code, CloseFrame, Message};
use futures::{Sink, SinkExt, Stream};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::hooks::SessionHooks;
use super::inbound::run_inbound;
use super::outbound::{run_outbound, send_wire};
use super::rate_gate::RateGate;
use super::session::SessionStore;
use super::PumpExit;
use crate::agent::{input_channel, AgentEngine, Modality, OpenConversation};
use crate::config::{Config, RelayConfig};
use crate::error::Result;
use crate::gateway::protocol::WireMessage;
use crate::tools::ToolPipeline;

/// Deferred UI commands buffered between the rate gate and the outbound pump
const DEFERRED_CHANNEL_CAPACITY: usize = 4;

/// Process-wide relay state shared by every connection
pub struct RelayContext {
    pub engine: Arc<dyn AgentEngine>,
    pub sessions: SessionStore,
    pub pipeline: Arc<ToolPipeline>,
    pub relay: RelayConfig,
    pub default_customer_id: String,
}

impl RelayContext {
    pub fn new(config: &Config, engine: Arc<dyn AgentEngine>, pipeline: Arc<ToolPipeline>) -> Self {
        RelayContext {
            engine,
            sessions: SessionStore::new(),
            pipeline,
            relay: config.relay.clone(),
            default_customer_id: config.guard.default_customer_id.clone(),
        }
    }

    pub fn gate(&self) -> RateGate {
        RateGate::from_config(&self.relay)
    }
}

/// Connection parameters taken from the upgrade request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub session_id: String,
    pub is_audio: bool,
}

impl ConnectParams {
    pub fn new(session_id: impl Into<String>, is_audio: bool) -> Self {
        ConnectParams {
            session_id: session_id.into(),
            is_audio,
        }
    }
}

/// How a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Close code sent to the client
    pub close_code: u16,
    /// The engine conversation could not be opened; no pump ran
    pub setup_failed: bool,
    /// A pump faulted or panicked
    pub faulted: bool,
}

/// Serve one client connection from accept to close
pub async fn run_session<Si, St, E>(
    ctx: Arc<RelayContext>,
    params: ConnectParams,
    sink: Si,
    stream: St,
) -> SessionOutcome
where
    Si: Sink<Message> + Unpin + Send + 'static,
    Si::Error: Display,
    St: Stream<Item = std::result::Result<Message, E>> + Unpin + Send + 'static,
    E: Display + Send + 'static,
{
    let session_id = params.session_id.clone();
    let sink = Arc::new(Mutex::new(sink));
    let session = ctx
        .sessions
        .attach(&session_id, &ctx.default_customer_id, params.is_audio)
        .await;

    let (queue, input_rx) = input_channel(ctx.relay.input_queue_capacity);
    let (deferred_tx, deferred_rx) = mpsc::channel(DEFERRED_CHANNEL_CAPACITY);
    let hooks = Arc::new(SessionHooks::new(
        session.clone(),
        ctx.gate(),
        ctx.pipeline.clone(),
        deferred_tx,
    ));
    let conversation = OpenConversation {
        session_id: session_id.clone(),
        user_id: session.owner().to_string(),
        app_name: ctx.relay.app_name.clone(),
        modality: Modality::from_audio_flag(params.is_audio),
        tools: ctx.pipeline.definitions(),
        hooks,
    };

    let events = match ctx.engine.open(conversation, input_rx).await {
        Ok(events) => events,
        Err(e) => {
            error!(
                session_id = %session_id,
                engine = %ctx.engine.name(),
                fatal = e.is_fatal_to_session(),
                error = %e,
                "Failed to start agent session"
            );
            if let Err(send_err) = send_wire(&sink, &WireMessage::runtime_error(e.to_string())).await {
                warn!(session_id = %session_id, error = %send_err, "Could not report setup failure");
            }
            close_socket(&ctx, &sink, &session_id, close_code::ERROR).await;
            ctx.sessions.detach(&session).await;
            return SessionOutcome {
                close_code: close_code::ERROR,
                setup_failed: true,
                faulted: false,
            };
        }
    };
    info!(session_id = %session_id, engine = %ctx.engine.name(), audio = params.is_audio, "Agent session started");

    let cancel = CancellationToken::new();
    let mut inbound = tokio::spawn(run_inbound(
        session_id.clone(),
        stream,
        queue.clone(),
        cancel.clone(),
    ));
    let mut outbound = tokio::spawn(run_outbound(
        session_id.clone(),
        events,
        deferred_rx,
        sink.clone(),
        cancel.clone(),
    ));

    let (inbound_first, first_result) = tokio::select! {
        result = &mut inbound => (true, result),
        result = &mut outbound => (false, result),
    };
    cancel.cancel();

    let (first_name, sibling_name, mut sibling) = if inbound_first {
        ("inbound", "outbound", outbound)
    } else {
        ("outbound", "inbound", inbound)
    };

    let mut faulted = record_pump(&session_id, first_name, first_result);
    match tokio::time::timeout(ctx.relay.shutdown_grace, &mut sibling).await {
        Ok(result) => faulted |= record_pump(&session_id, sibling_name, result),
        Err(_) => {
            warn!(
                session_id = %session_id,
                pump = sibling_name,
                grace_ms = ctx.relay.shutdown_grace.as_millis() as u64,
                "Pump ignored cancellation, aborting"
            );
            sibling.abort();
        }
    }

    queue.close();
    drop(queue);

    if faulted {
        if let Err(e) = send_wire(&sink, &WireMessage::server_error()).await {
            info!(session_id = %session_id, error = %e, "Could not report fault, socket not writable");
        }
    }
    let code = if faulted {
        close_code::ERROR
    } else {
        close_code::NORMAL
    };
    close_socket(&ctx, &sink, &session_id, code).await;
    ctx.sessions.detach(&session).await;

    info!(session_id = %session_id, close_code = code, faulted, "Session finished");
    SessionOutcome {
        close_code: code,
        setup_failed: false,
        faulted,
    }
}

/// Log a pump's terminal outcome; returns whether it faulted
fn record_pump(
    session_id: &str,
    pump: &str,
    result: std::result::Result<Result<PumpExit>, JoinError>,
) -> bool {
    match result {
        Ok(Ok(exit)) => {
            info!(session_id = %session_id, pump, exit = ?exit, "Pump terminated");
            false
        }
        Ok(Err(e)) => {
            error!(session_id = %session_id, pump, error = %e, "Pump faulted");
            true
        }
        Err(e) if e.is_cancelled() => {
            info!(session_id = %session_id, pump, "Pump aborted");
            false
        }
        Err(e) => {
            error!(session_id = %session_id, pump, error = %e, "Pump panicked");
            true
        }
    }
}

/// Send the close frame and shut the sink. Bounded by the grace period so a
/// stalled socket cannot hold the connection open.
async fn close_socket<Si>(ctx: &RelayContext, sink: &Mutex<Si>, session_id: &str, code: u16)
where
    Si: Sink<Message> + Unpin,
    Si::Error: Display,
{
    let reason = if code == close_code::NORMAL {
        "session closed"
    } else {
        "internal error"
    };
    let close = async {
        let mut sink = sink.lock().await;
        let frame = Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_string().into(),
        }));
        if let Err(e) = sink.send(frame).await {
            info!(session_id = %session_id, error = %e, "Close frame not delivered");
        }
        if let Err(e) = sink.close().await {
            debug!(session_id = %session_id, error = %e, "Sink close failed");
        }
    };

    if tokio::time::timeout(ctx.relay.shutdown_grace, close).await.is_err() {
        warn!(session_id = %session_id, "Timed out closing socket");
    }
}

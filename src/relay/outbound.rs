//! Outbound pump: engine events to wire frames

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::Message;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::{Sink, SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::classifier::{classify, OutboundEvent};
use super::PumpExit;
use crate::agent::EventStream;
use crate::error::{Error, Result};
use crate::gateway::protocol::WireMessage;
use crate::tools::UiCommand;

/// Text command rewritten for older clients
pub const LEGACY_SHIPPING_COMMAND: &str = "display_shipping_options_ui";

/// Write one frame to a shared sink
pub async fn send_wire<S>(sink: &Mutex<S>, message: &WireMessage) -> Result<()>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let text = message.to_json()?;
    sink.lock()
        .await
        .send(Message::Text(text.into()))
        .await
        .map_err(|e| Error::Transport(e.to_string()))
}

/// Turn a classified event into its wire frame. Returns `None` when the
/// event is recognized but carries nothing to send.
pub fn to_wire(session_id: &str, event: OutboundEvent) -> Option<WireMessage> {
    let frame = match event {
        OutboundEvent::TurnStatus {
            turn_complete,
            interrupted,
            interaction_completed,
        } => WireMessage::status(turn_complete, interrupted, interaction_completed),
        OutboundEvent::Theme { theme: Some(theme) } => {
            WireMessage::command("set_theme", Some(json!({ "theme": theme })))
        }
        OutboundEvent::Theme { theme: None } => {
            warn!(session_id = %session_id, direction = "S2C", "'set_theme' action missing theme value");
            return None;
        }
        OutboundEvent::CartRefresh => WireMessage::command("refresh_cart", None),
        OutboundEvent::ProductRecommendations(payload) => WireMessage::Raw(Value::Object(payload)),
        OutboundEvent::CheckoutModal(payload) => {
            WireMessage::command("trigger_checkout_modal", Some(Value::Object(payload)))
        }
        OutboundEvent::DisplayUi(command) => deferred_frame(command),
        OutboundEvent::RawUiCommand(command) => {
            if command.get("command_name").and_then(Value::as_str) == Some(LEGACY_SHIPPING_COMMAND) {
                info!(session_id = %session_id, direction = "S2C", "Rewriting legacy shipping command to initiate_checkout");
                WireMessage::Raw(json!({ "type": "initiate_checkout" }))
            } else {
                WireMessage::Raw(Value::Object(command))
            }
        }
        OutboundEvent::Text(text) => WireMessage::text(text),
        OutboundEvent::Audio(bytes) => WireMessage::audio(STANDARD.encode(bytes)),
    };
    Some(frame)
}

/// Frame for a UI command handed off by the rate gate
pub fn deferred_frame(command: UiCommand) -> WireMessage {
    WireMessage::ui_command(command.ui_element, command.payload)
}

/// Drain `events` and `deferred` onto `sink` until the stream ends, the sink
/// fails or `cancel` fires. An engine stream error is returned as a fault.
pub async fn run_outbound<S>(
    session_id: String,
    mut events: EventStream,
    mut deferred: mpsc::Receiver<UiCommand>,
    sink: Arc<Mutex<S>>,
    cancel: CancellationToken,
) -> Result<PumpExit>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: Display,
{
    info!(session_id = %session_id, direction = "S2C", "Outbound pump started");
    let mut deferred_open = true;

    let exit = loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => break PumpExit::Cancelled,
            command = deferred.recv(), if deferred_open => match command {
                Some(command) => {
                    debug!(session_id = %session_id, direction = "S2C", ui_element = %command.ui_element, "Sending deferred UI command");
                    deferred_frame(command)
                }
                None => {
                    deferred_open = false;
                    continue;
                }
            },
            event = events.next() => match event {
                None => break PumpExit::EndOfStream,
                Some(Err(e)) => {
                    warn!(session_id = %session_id, direction = "S2C", error = %e, "Engine stream failed");
                    return Err(e);
                }
                Some(Ok(event)) => {
                    let Some((category, outbound)) = classify(&event) else {
                        debug!(session_id = %session_id, direction = "S2C", "Dropping event with no recognizable content");
                        continue;
                    };
                    debug!(session_id = %session_id, direction = "S2C", category = %category, "Classified event");
                    match to_wire(&session_id, outbound) {
                        Some(frame) => frame,
                        None => continue,
                    }
                }
            },
        };

        if let Err(e) = send_wire(&sink, &frame).await {
            info!(session_id = %session_id, direction = "S2C", error = %e, "Client went away while sending");
            break PumpExit::Disconnected;
        }
    };

    info!(session_id = %session_id, direction = "S2C", exit = ?exit, "Outbound pump finished");
    Ok(exit)
}

//! Inbound pump: wire frames to agent input

use std::fmt::Display;

use axum::extract::ws::Message;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::PumpExit;
use crate::agent::{AgentInput, Blob, InputPart, InputQueue, PCM_AUDIO, TEXT_PLAIN};
use crate::error::Result;
use crate::gateway::protocol::{ClientMessage, ClientPart};

/// What one client message turns into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundAction {
    /// Nothing to submit
    Ignore,
    /// Turn-based submission
    Content(AgentInput),
    /// Realtime audio submission
    Realtime(Blob),
}

/// Translate one parsed client message
pub fn translate(session_id: &str, message: ClientMessage) -> InboundAction {
    match message {
        ClientMessage::Ready => {
            debug!(session_id = %session_id, direction = "C2S", "Client ready");
            InboundAction::Ignore
        }
        ClientMessage::Composite(parts) => {
            let input = assemble_parts(session_id, &parts);
            if input.is_empty() {
                warn!(session_id = %session_id, direction = "C2S", "No usable parts in message");
                InboundAction::Ignore
            } else {
                InboundAction::Content(input)
            }
        }
        ClientMessage::SingleFrame(part) => translate_single(session_id, part),
    }
}

/// Decode a multi-part message, keeping every part that decodes in order
pub fn assemble_parts(session_id: &str, parts: &[Value]) -> AgentInput {
    let decoded = parts
        .iter()
        .filter_map(|raw| {
            let part = match ClientPart::from_value(raw) {
                Ok(part) => part,
                Err(e) => {
                    warn!(session_id = %session_id, direction = "C2S", error = %e, "Dropping malformed part");
                    return None;
                }
            };

            if part.mime_type.starts_with("image/") {
                match STANDARD.decode(part.data.as_bytes()) {
                    Ok(bytes) => Some(InputPart::Binary(Blob::new(part.mime_type, bytes))),
                    Err(e) => {
                        warn!(session_id = %session_id, direction = "C2S", mime_type = %part.mime_type, error = %e, "Dropping undecodable image part");
                        None
                    }
                }
            } else if part.mime_type == TEXT_PLAIN {
                Some(InputPart::Text(part.data))
            } else {
                warn!(session_id = %session_id, direction = "C2S", mime_type = %part.mime_type, "Skipping unsupported part");
                None
            }
        })
        .collect();

    AgentInput::new(decoded)
}

fn translate_single(session_id: &str, part: ClientPart) -> InboundAction {
    let mime_type = part.mime_type.as_str();

    if mime_type == TEXT_PLAIN {
        return InboundAction::Content(AgentInput::from_text(part.data));
    }

    if mime_type == PCM_AUDIO || mime_type.starts_with("image/") {
        return match STANDARD.decode(part.data.as_bytes()) {
            Ok(bytes) => {
                let blob = Blob::new(mime_type, bytes);
                if blob.is_pcm_audio() {
                    InboundAction::Realtime(blob)
                } else {
                    InboundAction::Content(AgentInput::new(vec![InputPart::Binary(blob)]))
                }
            }
            Err(e) => {
                warn!(session_id = %session_id, direction = "C2S", mime_type = %mime_type, error = %e, "Dropping undecodable frame");
                InboundAction::Ignore
            }
        };
    }

    warn!(session_id = %session_id, direction = "C2S", mime_type = %mime_type, "Ignoring unhandled mime type");
    InboundAction::Ignore
}

/// Read client frames and feed the engine until the client leaves, the
/// engine stops accepting input or `cancel` fires. Bad messages are logged
/// and skipped.
pub async fn run_inbound<St, E>(
    session_id: String,
    mut stream: St,
    queue: InputQueue,
    cancel: CancellationToken,
) -> Result<PumpExit>
where
    St: Stream<Item = std::result::Result<Message, E>> + Unpin + Send,
    E: Display,
{
    info!(session_id = %session_id, direction = "C2S", "Inbound pump started");

    let exit = loop {
        let message = tokio::select! {
            biased;
            _ = cancel.cancelled() => break PumpExit::Cancelled,
            message = stream.next() => message,
        };

        let text = match message {
            None => break PumpExit::Disconnected,
            Some(Err(e)) => {
                info!(session_id = %session_id, direction = "C2S", error = %e, "Receive failed");
                break PumpExit::Disconnected;
            }
            Some(Ok(Message::Close(_))) => break PumpExit::Disconnected,
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(_)) => continue,
        };

        let parsed = match ClientMessage::parse(text.as_str()) {
            Ok(parsed) => parsed,
            Err(e) if e.is_client_error() => {
                warn!(session_id = %session_id, direction = "C2S", error = %e, "Skipping malformed message");
                continue;
            }
            Err(e) => {
                error!(session_id = %session_id, direction = "C2S", error = %e, "Failed to read message, skipping");
                continue;
            }
        };

        let submitted = match translate(&session_id, parsed) {
            InboundAction::Ignore => continue,
            InboundAction::Content(input) => {
                debug!(session_id = %session_id, direction = "C2S", parts = input.parts.len(), "Submitting content");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break PumpExit::Cancelled,
                    result = queue.send_content(input) => result,
                }
            }
            InboundAction::Realtime(blob) => {
                debug!(session_id = %session_id, direction = "C2S", bytes = blob.data.len(), "Submitting realtime audio");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break PumpExit::Cancelled,
                    result = queue.send_realtime(blob) => result,
                }
            }
        };

        if let Err(e) = submitted {
            info!(session_id = %session_id, direction = "C2S", error = %e, "Engine stopped accepting input");
            break PumpExit::EndOfStream;
        }
    };

    info!(session_id = %session_id, direction = "C2S", exit = ?exit, "Inbound pump finished");
    Ok(exit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{input_channel, LiveInput};
    use serde_json::json;

    #[test]
    fn test_composite_text_and_image_in_order() {
        let parts = vec![
            json!({"mime_type": "text/plain", "data": "hello"}),
            json!({"mime_type": "image/png", "data": "iVBORw=="}),
        ];
        let input = assemble_parts("s", &parts);
        assert_eq!(
            input,
            AgentInput::new(vec![
                InputPart::text("hello"),
                InputPart::Binary(Blob::new("image/png", vec![0x89, 0x50, 0x4e, 0x47])),
            ])
        );
    }

    #[test]
    fn test_bad_parts_are_dropped_individually() {
        let parts = vec![
            json!({"mime_type": "image/jpeg", "data": "%%%not-base64"}),
            json!("garbage"),
            json!({"mime_type": "application/pdf", "data": "AAAA"}),
            json!({"mime_type": "text/plain", "data": "kept"}),
        ];
        assert_eq!(assemble_parts("s", &parts), AgentInput::from_text("kept"));

        let nothing = vec![json!({"mime_type": "video/mp4", "data": "AAAA"})];
        let message = ClientMessage::Composite(nothing);
        assert_eq!(translate("s", message), InboundAction::Ignore);
    }

    #[test]
    fn test_single_frames() {
        assert_eq!(
            translate("s", ClientMessage::SingleFrame(ClientPart::new("text/plain", "hi"))),
            InboundAction::Content(AgentInput::from_text("hi"))
        );
        assert_eq!(
            translate("s", ClientMessage::SingleFrame(ClientPart::new("audio/pcm", "AAE="))),
            InboundAction::Realtime(Blob::new("audio/pcm", vec![0, 1]))
        );
        assert_eq!(
            translate("s", ClientMessage::SingleFrame(ClientPart::new("image/gif", "AAE="))),
            InboundAction::Content(AgentInput::new(vec![InputPart::Binary(Blob::new(
                "image/gif",
                vec![0, 1]
            ))]))
        );
        assert_eq!(
            translate("s", ClientMessage::SingleFrame(ClientPart::new("audio/pcm", "***"))),
            InboundAction::Ignore
        );
        assert_eq!(
            translate("s", ClientMessage::SingleFrame(ClientPart::new("audio/wav", "AAE="))),
            InboundAction::Ignore
        );
        assert_eq!(translate("s", ClientMessage::Ready), InboundAction::Ignore);
    }

    #[tokio::test]
    async fn test_pump_survives_bad_messages() {
        let frames: Vec<std::result::Result<Message, String>> = vec![
            Ok(Message::Text("client_ready".into())),
            Ok(Message::Text("{broken".into())),
            Ok(Message::Binary(vec![1, 2, 3].into())),
            Ok(Message::Text(r#"{"mime_type": "text/plain", "data": "one"}"#.into())),
            Ok(Message::Text(r#"{"mime_type": "audio/pcm", "data": "AAE="}"#.into())),
        ];
        let (queue, mut rx) = input_channel(8);

        let exit = run_inbound(
            "s".to_string(),
            futures::stream::iter(frames),
            queue,
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(exit, PumpExit::Disconnected);

        assert_eq!(rx.recv().await, Some(LiveInput::Content(AgentInput::from_text("one"))));
        assert_eq!(
            rx.recv().await,
            Some(LiveInput::Realtime(Blob::new("audio/pcm", vec![0, 1])))
        );
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_pump_stops_on_cancel() {
        let (queue, _rx) = input_channel(1);
        let cancel = CancellationToken::new();
        let stream = futures::stream::pending::<std::result::Result<Message, String>>();
        let pump = tokio::spawn(run_inbound("s".to_string(), stream, queue, cancel.clone()));

        cancel.cancel();
        assert_eq!(pump.await.unwrap().unwrap(), PumpExit::Cancelled);
    }
}

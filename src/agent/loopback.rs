//! Loopback engine
//!
//! A development engine with no model behind it. Text is echoed back, realtime
//! audio is returned unchanged and `/tool <name> <json-args>` dispatches a tool
//! call through the conversation hooks. It exercises every hook the relay
//! installs, which makes it the engine of choice for local runs and tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::engine::{AgentEngine, EventStream, InputReceiver, OpenConversation};
use super::types::{AgentInput, EnginePart, EngineEvent, InputPart, LiveInput, ModelRequest};
use crate::error::Result;
use crate::tools::ToolCall;

const TOOL_PREFIX: &str = "/tool";
const EVENT_BUFFER: usize = 64;
/// Most recent turns carried in each model request
const HISTORY_WINDOW: usize = 16;

/// Echo engine driven entirely by its input
#[derive(Debug, Clone, Default)]
pub struct LoopbackEngine;

impl LoopbackEngine {
    pub fn new() -> Self {
        LoopbackEngine
    }
}

#[async_trait]
impl AgentEngine for LoopbackEngine {
    fn name(&self) -> &str {
        "loopback"
    }

    async fn open(
        &self,
        conversation: OpenConversation,
        input: InputReceiver,
    ) -> Result<EventStream> {
        info!(
            session_id = %conversation.session_id,
            user_id = %conversation.user_id,
            modality = %conversation.modality,
            tools = conversation.tools.len(),
            "Loopback conversation opened"
        );

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(run_conversation(conversation, input, tx));

        let events = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (Ok(event), rx))
        });
        Ok(Box::pin(events))
    }
}

async fn run_conversation(
    conversation: OpenConversation,
    mut input: InputReceiver,
    tx: mpsc::Sender<EngineEvent>,
) {
    let mut history: VecDeque<AgentInput> = VecDeque::with_capacity(HISTORY_WINDOW);

    while let Some(item) = input.recv().await {
        let events = match item {
            LiveInput::Content(content) => {
                if history.len() == HISTORY_WINDOW {
                    history.pop_front();
                }
                history.push_back(content);
                let mut request = ModelRequest::new(history.iter().cloned().collect());
                conversation.hooks.before_request(&mut request).await;
                let Some(turn) = request.contents.pop() else {
                    continue;
                };
                respond(&conversation, turn).await
            }
            LiveInput::Realtime(blob) => vec![EngineEvent::with_parts(vec![EnginePart::inline_data(blob)])],
            LiveInput::Close => break,
        };

        for event in events {
            if tx.send(event).await.is_err() {
                debug!(session_id = %conversation.session_id, "Event consumer gone");
                return;
            }
        }
    }

    debug!(session_id = %conversation.session_id, "Loopback conversation finished");
}

async fn respond(conversation: &OpenConversation, turn: AgentInput) -> Vec<EngineEvent> {
    let mut events = Vec::with_capacity(turn.parts.len() + 1);

    for part in turn.parts {
        match part {
            InputPart::Text(text) => match parse_tool_command(&text) {
                Some(Ok((name, arguments))) => {
                    let call = ToolCall::new(name.clone(), arguments);
                    let response = conversation.hooks.call_tool(call).await;
                    events.push(EngineEvent::with_parts(vec![EnginePart::function_response(
                        name, response,
                    )]));
                }
                Some(Err(message)) => events.push(EngineEvent::text(message)),
                None => events.push(EngineEvent::text(text)),
            },
            InputPart::Binary(blob) => events.push(EngineEvent::text(format!(
                "received {} ({} bytes)",
                blob.mime_type,
                blob.data.len()
            ))),
        }
    }

    events.push(EngineEvent::turn_complete());
    events
}

/// Parse `/tool <name> [json-args]`. Returns `None` for ordinary text.
fn parse_tool_command(text: &str) -> Option<std::result::Result<(String, Value), String>> {
    let rest = text.trim().strip_prefix(TOOL_PREFIX)?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let rest = rest.trim();
    let (name, raw_args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    if name.is_empty() {
        return Some(Err("usage: /tool <name> <json-args>".to_string()));
    }

    if raw_args.is_empty() {
        return Some(Ok((name.to_string(), json!({}))));
    }
    Some(
        serde_json::from_str(raw_args)
            .map(|args| (name.to_string(), args))
            .map_err(|e| format!("Invalid tool arguments: {}", e)),
    )
}

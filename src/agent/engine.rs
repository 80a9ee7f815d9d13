//! Agent engine contract
//!
//! The relay talks to a conversational engine through three seams: an input
//! queue it submits to, an event stream it drains, and the [`TurnHooks`] the
//! engine calls back into before each model request and for each tool call.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use tokio::sync::mpsc;

use super::types::{AgentInput, Blob, EngineEvent, LiveInput, Modality, ModelRequest};
use crate::error::{Error, Result};
use crate::tools::{ToolCall, ToolDefinition};

/// Stream of engine output events for one conversation
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EngineEvent>> + Send>>;

/// Receiving side of the engine input channel
pub type InputReceiver = mpsc::Receiver<LiveInput>;

/// Interception points the engine invokes while processing a conversation
#[async_trait]
pub trait TurnHooks: Send + Sync {
    /// Called once before every model request the engine dispatches.
    /// May rewrite the request and may delay the caller.
    async fn before_request(&self, request: &mut ModelRequest);

    /// Execute a tool call on the engine's behalf and return the result
    /// object that should be fed back into the model.
    async fn call_tool(&self, call: ToolCall) -> Value;
}

/// Parameters for opening a conversation
#[derive(Clone)]
pub struct OpenConversation {
    pub session_id: String,
    pub user_id: String,
    pub app_name: String,
    pub modality: Modality,
    /// Tools the engine may call through `hooks`
    pub tools: Vec<ToolDefinition>,
    pub hooks: Arc<dyn TurnHooks>,
}

impl std::fmt::Debug for OpenConversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenConversation")
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id)
            .field("app_name", &self.app_name)
            .field("modality", &self.modality)
            .field("tools", &self.tools.len())
            .finish()
    }
}

/// A conversational agent engine
#[async_trait]
pub trait AgentEngine: Send + Sync {
    /// Engine name for logging
    fn name(&self) -> &str;

    /// Open a live conversation. The engine consumes `input` until it closes
    /// and returns the stream of output events.
    async fn open(&self, conversation: OpenConversation, input: InputReceiver)
        -> Result<EventStream>;
}

/// Relay side of the engine input channel
#[derive(Debug, Clone)]
pub struct InputQueue {
    tx: mpsc::Sender<LiveInput>,
}

/// Create a bounded engine input channel
pub fn input_channel(capacity: usize) -> (InputQueue, InputReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (InputQueue { tx }, rx)
}

impl InputQueue {
    /// Submit discrete turn content
    pub async fn send_content(&self, content: AgentInput) -> Result<()> {
        self.send(LiveInput::Content(content)).await
    }

    /// Submit continuous realtime media
    pub async fn send_realtime(&self, blob: Blob) -> Result<()> {
        self.send(LiveInput::Realtime(blob)).await
    }

    /// Tell the engine no more input will arrive. Never waits; if the
    /// channel is full the engine still sees the channel close once every
    /// queue handle is dropped.
    pub fn close(&self) {
        let _ = self.tx.try_send(LiveInput::Close);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, item: LiveInput) -> Result<()> {
        self.tx
            .send(item)
            .await
            .map_err(|_| Error::Engine("agent input channel closed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_input_queue_preserves_order() {
        let (queue, mut rx) = input_channel(4);
        queue.send_content(AgentInput::from_text("one")).await.unwrap();
        queue
            .send_realtime(Blob::new("audio/pcm", vec![0, 1]))
            .await
            .unwrap();
        queue.close();

        assert_eq!(
            rx.recv().await,
            Some(LiveInput::Content(AgentInput::from_text("one")))
        );
        assert!(matches!(rx.recv().await, Some(LiveInput::Realtime(_))));
        assert_eq!(rx.recv().await, Some(LiveInput::Close));
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped_is_engine_error() {
        let (queue, rx) = input_channel(1);
        drop(rx);

        let err = queue
            .send_content(AgentInput::from_text("lost"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Engine(_)));
        assert!(queue.is_closed());
    }
}

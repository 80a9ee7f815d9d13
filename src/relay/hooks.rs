//! Turn hooks installed on every conversation

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::rate_gate::RateGate;
use super::session::Session;
use crate::agent::{ModelRequest, TurnHooks};
use crate::tools::{ToolCall, ToolPipeline, UiCommand};

/// Connects engine callbacks to the session's rate gate and tool pipeline.
/// Deferred UI commands released by the gate are published to the outbound
/// pump over `deferred`.
pub struct SessionHooks {
    session: Arc<Session>,
    gate: RateGate,
    pipeline: Arc<ToolPipeline>,
    deferred: mpsc::Sender<UiCommand>,
}

impl SessionHooks {
    pub fn new(
        session: Arc<Session>,
        gate: RateGate,
        pipeline: Arc<ToolPipeline>,
        deferred: mpsc::Sender<UiCommand>,
    ) -> Self {
        SessionHooks {
            session,
            gate,
            pipeline,
            deferred,
        }
    }
}

#[async_trait]
impl TurnHooks for SessionHooks {
    async fn before_request(&self, request: &mut ModelRequest) {
        let admission = self.gate.admit(&self.session, request).await;

        if let Some(command) = admission.deferred {
            if self.deferred.send(command).await.is_err() {
                warn!(session_id = %self.session.id(), "Outbound pump gone, deferred UI command dropped");
            }
        }
    }

    async fn call_tool(&self, call: ToolCall) -> Value {
        debug!(session_id = %self.session.id(), tool = %call.name, call_id = %call.id, "Tool call");
        self.pipeline.invoke(&self.session, call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentInput;
    use crate::config::GuardConfig;
    use crate::tools::{StaticProfileProvider, ToolRegistry};
    use serde_json::json;
    use std::time::Duration;

    fn hooks(session: Arc<Session>, tx: mpsc::Sender<UiCommand>) -> SessionHooks {
        let pipeline = ToolPipeline::from_config(
            &GuardConfig::default(),
            ToolRegistry::new(),
            Arc::new(StaticProfileProvider::with_demo_customer("123")),
        );
        SessionHooks::new(
            session,
            RateGate::new(Duration::from_secs(60), 10),
            Arc::new(pipeline),
            tx,
        )
    }

    #[tokio::test]
    async fn test_only_last_staged_command_reaches_outbound() {
        let session = Arc::new(Session::new("s", "123", false));
        let (tx, mut rx) = mpsc::channel(4);
        let hooks = hooks(session.clone(), tx);

        session.stage_deferred(UiCommand::new("first", json!({}))).await;
        session.stage_deferred(UiCommand::new("second", json!({}))).await;

        let mut request = ModelRequest::new(vec![AgentInput::from_text("next turn")]);
        hooks.before_request(&mut request).await;
        hooks.before_request(&mut request).await;

        assert_eq!(rx.try_recv().unwrap(), UiCommand::new("second", json!({})));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_call_tool_runs_pipeline() {
        let session = Arc::new(Session::new("s", "123", false));
        let (tx, _rx) = mpsc::channel(1);
        let hooks = hooks(session, tx);

        let result = hooks
            .call_tool(ToolCall::new("sync_ask_for_approval", json!({"value": 5})))
            .await;
        assert_eq!(result["status"], "approved");
    }
}

//! Tool result post-processing
//!
//! UI-display results are staged on the session for the next turn instead of
//! being fed back to the model.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::relay::Session;

/// `action` value marking a tool result as a UI-display instruction
pub const DISPLAY_UI_ACTION: &str = "display_ui";

/// A UI instruction addressed to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiCommand {
    /// UI element the client should render
    pub ui_element: String,
    pub payload: Value,
}

impl UiCommand {
    pub fn new(ui_element: impl Into<String>, payload: Value) -> Self {
        UiCommand {
            ui_element: ui_element.into(),
            payload,
        }
    }

    /// Recognize `{"action": "display_ui", "ui_element": ..., "payload": ...}`
    pub fn from_tool_result(result: &Value) -> Option<UiCommand> {
        let object = result.as_object()?;
        if object.get("action").and_then(Value::as_str) != Some(DISPLAY_UI_ACTION) {
            return None;
        }
        let ui_element = object.get("ui_element")?.as_str()?;
        let payload = object.get("payload")?.clone();
        Some(UiCommand::new(ui_element, payload))
    }
}

/// After-call hook applied to every tool result
#[derive(Debug, Clone, Default)]
pub struct PostProcessor;

impl PostProcessor {
    pub fn new() -> Self {
        PostProcessor
    }

    /// Inspect `result`; returns what the engine should see
    pub async fn process(&self, session: &Session, tool_name: &str, result: Value) -> Value {
        log_approval_outcome(session, tool_name, &result);

        if result.get("action").and_then(Value::as_str) != Some(DISPLAY_UI_ACTION) {
            return result;
        }

        match UiCommand::from_tool_result(&result) {
            Some(command) => {
                info!(
                    session_id = %session.id(),
                    tool = %tool_name,
                    ui_element = %command.ui_element,
                    "Staging UI command for next turn"
                );
                if let Some(replaced) = session.stage_deferred(command).await {
                    debug!(
                        session_id = %session.id(),
                        ui_element = %replaced.ui_element,
                        "Replaced unconsumed UI command"
                    );
                }
            }
            None => warn!(
                session_id = %session.id(),
                tool = %tool_name,
                "display_ui result without ui_element or payload, dropped"
            ),
        }
        empty_result()
    }
}

fn log_approval_outcome(session: &Session, tool_name: &str, result: &Value) {
    let expected = match tool_name {
        "sync_ask_for_approval" => "approved",
        "approve_discount" => "ok",
        _ => return,
    };

    let status = result.get("status").and_then(Value::as_str);
    if status == Some(expected) {
        info!(session_id = %session.id(), tool = %tool_name, response = %result, "Discount approved");
    } else {
        info!(
            session_id = %session.id(),
            tool = %tool_name,
            response = %result,
            "Discount not approved or status unknown"
        );
    }
}

/// Empty tool result returned in place of staged UI payloads
pub fn empty_result() -> Value {
    json!({})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tool_result() {
        let command = UiCommand::from_tool_result(&json!({
            "action": "display_ui",
            "ui_element": "shipping_options",
            "payload": {"options": [1, 2]}
        }))
        .unwrap();
        assert_eq!(command.ui_element, "shipping_options");
        assert_eq!(command.payload, json!({"options": [1, 2]}));

        assert!(UiCommand::from_tool_result(&json!({"action": "display_ui"})).is_none());
        assert!(UiCommand::from_tool_result(&json!({"action": "refresh_cart"})).is_none());
        assert!(UiCommand::from_tool_result(&json!("display_ui")).is_none());
    }

    #[tokio::test]
    async fn test_display_ui_result_is_staged_and_hidden() {
        let session = Session::new("s", "123", false);
        let processed = PostProcessor::new()
            .process(
                &session,
                "show_options",
                json!({"action": "display_ui", "ui_element": "picker", "payload": {}}),
            )
            .await;

        assert_eq!(processed, empty_result());
        assert_eq!(
            session.take_deferred().await,
            Some(UiCommand::new("picker", json!({})))
        );
    }

    #[tokio::test]
    async fn test_incomplete_display_ui_result_is_hidden_not_staged() {
        let session = Session::new("s", "123", false);
        let processor = PostProcessor::new();

        let processed = processor
            .process(&session, "t", json!({"action": "display_ui", "payload": {"secret": "raw"}}))
            .await;
        assert_eq!(processed, empty_result());
        assert!(session.take_deferred().await.is_none());

        let processed = processor
            .process(&session, "t", json!({"action": "display_ui", "ui_element": 7, "payload": {}}))
            .await;
        assert_eq!(processed, empty_result());
        assert!(session.take_deferred().await.is_none());
    }

    #[tokio::test]
    async fn test_ordinary_result_passes_through() {
        let session = Session::new("s", "123", false);
        let result = json!({"status": "approved", "message": "ok"});
        let processed = PostProcessor::new()
            .process(&session, "sync_ask_for_approval", result.clone())
            .await;

        assert_eq!(processed, result);
        assert!(session.take_deferred().await.is_none());
    }
}

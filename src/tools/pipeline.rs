//! Tool pipeline: guard, tool body, post-processor

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::guard::{GuardDecision, ToolGuard};
use super::post_process::PostProcessor;
use super::profile::ProfileProvider;
use super::registry::ToolRegistry;
use super::traits::{ToolCall, ToolDefinition};
use crate::config::GuardConfig;
use crate::relay::Session;

/// Everything a tool call passes through on its way to the engine
pub struct ToolPipeline {
    registry: ToolRegistry,
    guard: ToolGuard,
    post: PostProcessor,
}

impl ToolPipeline {
    pub fn new(registry: ToolRegistry, guard: ToolGuard) -> Self {
        ToolPipeline {
            registry,
            guard,
            post: PostProcessor::new(),
        }
    }

    pub fn from_config(
        config: &GuardConfig,
        registry: ToolRegistry,
        profiles: Arc<dyn ProfileProvider>,
    ) -> Self {
        Self::new(registry, ToolGuard::from_config(config, profiles))
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    /// Run one tool call for `session` and return the value the engine sees
    pub async fn invoke(&self, session: &Session, mut call: ToolCall) -> Value {
        let result = match self.guard.check(session, &mut call).await {
            GuardDecision::ShortCircuit(result) => {
                debug!(session_id = %session.id(), tool = %call.name, "Tool call short-circuited");
                result
            }
            GuardDecision::Proceed => match self.registry.execute(&call).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(session_id = %session.id(), tool = %call.name, error = %e, "Tool execution failed");
                    json!({ "error": e.to_string() })
                }
            },
        };

        self.post.process(session, &call.name, result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::tools::profile::StaticProfileProvider;
    use crate::tools::traits::Tool;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingTool {
        name: &'static str,
        calls: Arc<AtomicUsize>,
        result: Value,
    }

    #[async_trait]
    impl Tool for RecordingTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "records invocations"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn execute(&self, _args: Value) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.result.clone())
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "schedule_planting_service"
        }

        fn description(&self) -> &str {
            "always fails"
        }

        fn parameters_schema(&self) -> Value {
            json!({})
        }

        async fn execute(&self, _args: Value) -> Result<Value> {
            Err(Error::Tool("calendar unavailable".to_string()))
        }
    }

    fn pipeline(tool: RecordingTool) -> ToolPipeline {
        let mut registry = ToolRegistry::new();
        registry.register(tool);
        registry.register(FailingTool);
        ToolPipeline::from_config(
            &GuardConfig::default(),
            registry,
            Arc::new(StaticProfileProvider::with_demo_customer("123")),
        )
    }

    #[tokio::test]
    async fn test_identity_mismatch_never_reaches_tool_body() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = pipeline(RecordingTool {
            name: "access_cart_information",
            calls: calls.clone(),
            result: json!({"items": []}),
        });
        let session = Session::new("s", "123", false);

        let result = pipeline
            .invoke(&session, ToolCall::new("access_cart_information", json!({"customer_id": "999"})))
            .await;

        assert_eq!(
            result,
            json!({"error": "You cannot use the tool with customer_id 999, only for 123."})
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let ok = pipeline
            .invoke(&session, ToolCall::new("access_cart_information", json!({"customer_id": "123"})))
            .await;
        assert_eq!(ok, json!({"items": []}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_display_ui_result_is_deferred() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = pipeline(RecordingTool {
            name: "show_planting_calendar",
            calls,
            result: json!({"action": "display_ui", "ui_element": "calendar", "payload": {"days": 3}}),
        });
        let session = Session::new("s", "123", false);

        let result = pipeline
            .invoke(&session, ToolCall::new("show_planting_calendar", json!({})))
            .await;

        assert_eq!(result, json!({}));
        let staged = session.take_deferred().await.unwrap();
        assert_eq!(staged.ui_element, "calendar");
        assert_eq!(staged.payload, json!({"days": 3}));
    }

    #[tokio::test]
    async fn test_tool_error_becomes_error_object() {
        let pipeline = pipeline(RecordingTool {
            name: "noop",
            calls: Arc::new(AtomicUsize::new(0)),
            result: json!(null),
        });
        let session = Session::new("s", "123", false);

        let result = pipeline
            .invoke(&session, ToolCall::new("schedule_planting_service", json!({})))
            .await;
        assert_eq!(result, json!({"error": "Tool error: calendar unavailable"}));

        let unknown = pipeline.invoke(&session, ToolCall::new("nope", json!({}))).await;
        assert_eq!(unknown, json!({"error": "Unknown tool: nope"}));
    }
}

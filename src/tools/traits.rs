//! Core tool trait and call types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// A business tool the agent engine can call
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name
    fn name(&self) -> &str;

    /// Get the tool description
    fn description(&self) -> &str;

    /// Get the JSON Schema for tool parameters
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with given arguments and return its result object
    async fn execute(&self, args: Value) -> Result<Value>;

    /// Describe the tool for an engine
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Tool description handed to the engine when a conversation opens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A tool call request from the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool call ID
    pub id: String,
    /// Tool name
    pub name: String,
    /// Tool arguments as JSON
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        ToolCall {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            arguments,
        }
    }

    /// Parse arguments into a specific type
    pub fn parse_arguments<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        serde_json::from_value(self.arguments.clone())
            .map_err(|e| Error::Tool(format!("Invalid tool arguments: {}", e)))
    }

    /// Look up a top-level argument
    pub fn argument(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct CartArgs {
        customer_id: String,
        items_added: bool,
    }

    #[test]
    fn test_parse_arguments() {
        let call = ToolCall::new("modify_cart", json!({"customer_id": "123", "items_added": true}));
        let args: CartArgs = call.parse_arguments().unwrap();
        assert_eq!(args.customer_id, "123");
        assert!(args.items_added);

        let bad = ToolCall::new("modify_cart", json!({"customer_id": 5}));
        assert!(matches!(bad.parse_arguments::<CartArgs>(), Err(Error::Tool(_))));
    }
}

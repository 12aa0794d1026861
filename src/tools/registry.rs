//! Dispatches a tool call by name to its registered [`Tool`],
//! validating declared-required arguments before executing, and adapts
//! to [`crate::llm::ToolExecutor`] so a [`ToolRegistry`] can be handed
//! straight to a Session's response-generation loop.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::llm::{ToolDefinition, ToolExecutor};

use super::types::{Tool, ToolContext};

/// Per-session tool dispatch table. Bound to exactly one Session via
/// its [`ToolContext`] — construct a fresh instance per Session, not a
/// shared singleton, since the context carries the session id.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    ctx: ToolContext,
}

impl ToolRegistry {
    pub fn new(ctx: ToolContext, tools: Vec<Arc<dyn Tool>>) -> Self {
        let mut map = HashMap::new();
        for tool in tools {
            map.insert(tool.name().to_string(), tool);
        }
        Self { tools: map, ctx }
    }

    /// Declarations to offer the language service.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.schema(),
            })
            .collect()
    }

    fn validate_required(tool: &dyn Tool, args: &serde_json::Value) -> Result<(), String> {
        let schema = tool.schema();
        let Some(required) = schema.get("required").and_then(|r| r.as_array()) else {
            return Ok(());
        };
        let obj = args.as_object();
        for field in required {
            let Some(field_name) = field.as_str() else {
                continue;
            };
            let present = obj.map(|o| o.contains_key(field_name)).unwrap_or(false);
            if !present {
                return Err(format!("missing required argument: {field_name}"));
            }
        }
        Ok(())
    }

    pub async fn dispatch(&self, name: &str, args: serde_json::Value) -> Result<String, String> {
        let Some(tool) = self.tools.get(name) else {
            return Err(format!("unknown tool: {name}"));
        };
        if let Err(err) = Self::validate_required(tool.as_ref(), &args) {
            warn!(tool = name, error = %err, "tool call rejected by schema validation");
            return Err(err);
        }
        match tool.execute(&self.ctx, args).await {
            Ok(result) if result.success => Ok(result.content),
            Ok(result) => Err(result.error.unwrap_or_else(|| "tool reported failure".into())),
            Err(err) => Err(err.to_string()),
        }
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute(&self, name: &str, args: &str) -> Result<String, String> {
        let parsed: serde_json::Value =
            serde_json::from_str(args).map_err(|e| format!("invalid JSON arguments: {e}"))?;
        self.dispatch(name, parsed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::session::SessionRegistry;
    use crate::tools::types::ToolResult;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its `text` argument"
        }
        fn schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            })
        }
        async fn execute(&self, _ctx: &ToolContext, args: serde_json::Value) -> Result<ToolResult, LlmError> {
            let text = args.get("text").and_then(|v| v.as_str()).unwrap_or_default();
            Ok(ToolResult::success(text.to_string()))
        }
    }

    fn registry() -> ToolRegistry {
        let ctx = ToolContext {
            session_id: "S1".into(),
            registry: Arc::new(SessionRegistry::new()),
        };
        ToolRegistry::new(ctx, vec![Arc::new(EchoTool)])
    }

    #[tokio::test]
    async fn dispatch_rejects_missing_required_argument() {
        let reg = registry();
        let result = reg.dispatch("echo", serde_json::json!({})).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn dispatch_invokes_matching_tool() {
        let reg = registry();
        let result = reg.dispatch("echo", serde_json::json!({"text": "hi"})).await;
        assert_eq!(result.unwrap(), "hi");
    }

    #[tokio::test]
    async fn dispatch_unknown_tool_is_an_error() {
        let reg = registry();
        let result = reg.dispatch("nonexistent", serde_json::json!({})).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn tool_executor_adapts_json_string_arguments() {
        let reg = registry();
        let result = reg.execute("echo", r#"{"text":"via executor"}"#).await;
        assert_eq!(result.unwrap(), "via executor");
    }

    #[tokio::test]
    async fn tool_executor_rejects_malformed_json() {
        let reg = registry();
        let result = reg.execute("echo", "{not json").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn definitions_lists_declared_tools() {
        let reg = registry();
        let defs = reg.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
    }
}

//! Core tool types: the [`Tool`] trait every tool implements and
//! [`ToolResult`] for its bounded output.

use async_trait::async_trait;

use crate::llm::LlmError;

/// Default maximum output size (100 KB), matching the bound the
/// language service driver is comfortable streaming back as a single
/// `tool-result` payload.
pub const DEFAULT_MAX_BYTES: usize = 100 * 1024;

/// Result of a tool execution.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub success: bool,
    pub content: String,
    pub error: Option<String>,
    pub truncated: bool,
}

impl ToolResult {
    pub fn success(content: String) -> Self {
        Self {
            success: true,
            content,
            error: None,
            truncated: false,
        }
    }

    pub fn failure(error: String) -> Self {
        Self {
            success: false,
            content: String::new(),
            error: Some(error),
            truncated: false,
        }
    }
}

/// Truncate a string to at most `max_bytes`, respecting UTF-8
/// boundaries.
pub fn truncate_output(s: &str, max_bytes: usize) -> (String, bool) {
    if s.len() <= max_bytes {
        return (s.to_string(), false);
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    let truncated = &s[..end];
    (
        format!("{truncated}\n\n[output truncated at {max_bytes} bytes]"),
        true,
    )
}

/// Everything a tool needs to affect its owning Session without
/// holding a strong back-reference to it: the Session's stable id plus
/// a handle through which the registry resolves it for each call.
pub struct ToolContext {
    pub session_id: String,
    pub registry: std::sync::Arc<crate::session::registry::SessionRegistry>,
}

/// A tool exposed to the language service. Each tool declares a strict
/// JSON-schema input contract and executes against a [`ToolContext`]
/// rather than a direct Session reference.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn schema(&self) -> serde_json::Value;

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: serde_json::Value,
    ) -> Result<ToolResult, LlmError>;
}

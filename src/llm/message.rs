//! Canonical message types sent to the language service.
//!
//! This is the wire-shape boundary: the only component that knows a
//! particular provider's request/response schema is the
//! [`ProviderAdapter`](super::provider::ProviderAdapter) implementation;
//! everything upstream of it works with these types.

use serde::{Deserialize, Serialize};

/// The role of a message in a conversation sent to the language service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// The content of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: String },
    ToolResult { call_id: String, content: String },
}

/// An assistant tool call included in an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantToolCall {
    pub call_id: String,
    pub function_name: String,
    pub arguments: String,
}

/// A message in the canonical conversation history sent to the
/// language service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<AssistantToolCall>,
}

impl Message {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text { text: text.into() },
            tool_calls: Vec::new(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::text(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(Role::Assistant, text)
    }

    pub fn assistant_with_tool_calls(
        text: Option<String>,
        tool_calls: Vec<AssistantToolCall>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text {
                text: text.unwrap_or_default(),
            },
            tool_calls,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: MessageContent::ToolResult {
                call_id: call_id.into(),
                content: content.into(),
            },
            tool_calls: Vec::new(),
        }
    }
}

/// Conversion from the session-level [`crate::conversation::Message`]
/// log into the canonical wire messages the language service consumes.
pub fn from_conversation(messages: &[crate::conversation::Message]) -> Vec<Message> {
    use crate::conversation::{Content, Role as ConvRole};

    let mut out = Vec::with_capacity(messages.len());
    for m in messages {
        match (&m.role, &m.content) {
            (ConvRole::User, Content::Text(text)) => out.push(Message::user(text.clone())),
            (ConvRole::Assistant, Content::Text(text)) => {
                out.push(Message::assistant(text.clone()))
            }
            (ConvRole::ToolCall, Content::Structured(parts)) => {
                let mut text_parts = Vec::new();
                let mut tool_calls = Vec::new();
                for part in parts {
                    match part {
                        crate::conversation::Part::Text { text } => text_parts.push(text.clone()),
                        crate::conversation::Part::ToolCall {
                            call_id,
                            name,
                            args,
                        } => tool_calls.push(AssistantToolCall {
                            call_id: call_id.clone(),
                            function_name: name.clone(),
                            arguments: args.clone(),
                        }),
                    }
                }
                let text = if text_parts.is_empty() {
                    None
                } else {
                    Some(text_parts.join(""))
                };
                out.push(Message::assistant_with_tool_calls(text, tool_calls));
            }
            (ConvRole::ToolResult, Content::ToolResults(results)) => {
                for r in results {
                    out.push(Message::tool_result(r.call_id.clone(), r.payload.clone()));
                }
            }
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_display() {
        assert_eq!(Role::System.to_string(), "system");
        assert_eq!(Role::Tool.to_string(), "tool");
    }

    #[test]
    fn message_user_constructor() {
        let msg = Message::user("hi");
        assert_eq!(msg.role, Role::User);
        assert!(msg.tool_calls.is_empty());
    }

    #[test]
    fn message_serde_round_trip() {
        let original = Message::assistant_with_tool_calls(
            Some("checking".into()),
            vec![AssistantToolCall {
                call_id: "c1".into(),
                function_name: "getCalendarAvailability".into(),
                arguments: "{}".into(),
            }],
        );
        let json = serde_json::to_string(&original).expect("serialize");
        let parsed: Message = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, original);
    }

    #[test]
    fn from_conversation_converts_user_and_assistant() {
        let mut conv = crate::conversation::Conversation::new();
        conv.append_user("hi there", None);
        conv.start_assistant();
        conv.extend_assistant("hello!");
        conv.finish_assistant();
        let snapshot = conv.snapshot(100);
        let wire = from_conversation(&snapshot);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, Role::User);
        assert_eq!(wire[1].role, Role::Assistant);
    }

    #[test]
    fn from_conversation_converts_tool_calls_and_results() {
        let mut conv = crate::conversation::Conversation::new();
        conv.add_assistant_structured(vec![crate::conversation::Part::ToolCall {
            call_id: "tc_1".into(),
            name: "getCalendarAvailability".into(),
            args: "{}".into(),
        }]);
        conv.add_tool_results(vec![crate::conversation::ToolResultEntry {
            call_id: "tc_1".into(),
            payload: "[]".into(),
        }]);
        let wire = from_conversation(&conv.snapshot(100));
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].tool_calls.len(), 1);
        assert_eq!(wire[1].role, Role::Tool);
    }
}

//! Normalized streaming event model produced by the language service.
//!
//! ```text
//! start → text-delta* → finish
//! start → tool-call → tool-result | tool-error → finish
//! start → reasoning-start → reasoning-delta* → reasoning-end → text-delta* → finish
//! (any point) → abort
//! ```

/// A normalized streaming event from the language service.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmEvent {
    /// Stream opened. First event in every stream.
    Start { request_id: String },

    /// A chunk of generated text, routed to the Conversation Model and TTS.
    TextDelta { id: String, text: String },

    /// Informational text-segment boundaries.
    TextStart { id: String },
    TextEnd { id: String },

    /// Reasoning/thinking output. Logged only; never sent to TTS.
    ReasoningStart,
    ReasoningDelta { text: String },
    ReasoningEnd,

    /// A tool call, appended to the conversation via a structured message.
    ToolCall {
        id: String,
        name: String,
        args: String,
    },

    /// A tool's result, appended via `addToolResults`.
    ToolResult { id: String, payload: String },

    /// A tool's failure, appended and also logged.
    ToolError { id: String, cause: String },

    /// Stream ended normally.
    Finish { reason: FinishReason },

    /// Stream ended with a fault.
    Error { cause: String },

    /// Stream was cancelled.
    Abort,
}

/// Why the stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Cancelled,
    Other,
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stop => write!(f, "stop"),
            Self::Length => write!(f, "length"),
            Self::ToolCalls => write!(f, "tool_calls"),
            Self::ContentFilter => write!(f, "content_filter"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Other => write!(f, "other"),
        }
    }
}

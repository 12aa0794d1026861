//! Append-only typed conversation log with speaker labels and
//! partial-response truncation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Assistant,
    ToolCall,
    ToolResult,
}

/// Which human, in conference mode, a user message is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Caller,
    Owner,
}

impl Speaker {
    fn prefix(self) -> &'static str {
        match self {
            Self::Caller => "[CALLER]:",
            Self::Owner => "[OWNER]:",
        }
    }
}

/// One part of a structured assistant message (text or a tool call).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    Text { text: String },
    ToolCall {
        call_id: String,
        name: String,
        args: String,
    },
}

/// A tool result pair appended after tool execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResultEntry {
    pub call_id: String,
    pub payload: String,
}

/// Content carried by a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Content {
    Text(String),
    Structured(Vec<Part>),
    ToolResults(Vec<ToolResultEntry>),
}

/// A single, immutable entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,
    pub speaker: Option<Speaker>,
    pub index: u64,
}

/// Minimum codepoint length an interrupted partial assistant response
/// must reach before it is kept in history (below this, it is dropped
/// as a meaningless stub).
pub const INTERRUPTED_MIN_LEN: usize = 10;

/// In-progress assistant text buffer. At most one may exist per session.
#[derive(Debug, Default, Clone)]
struct PartialAssistant {
    text: String,
}

/// Append-only conversation log plus the current partial assistant
/// buffer and diarization-to-role bindings.
pub struct Conversation {
    messages: Vec<Message>,
    partial: Option<PartialAssistant>,
    next_index: u64,
    conference_mode: bool,
    speaker_bindings: HashMap<String, Speaker>,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            partial: None,
            next_index: 0,
            conference_mode: false,
            speaker_bindings: HashMap::new(),
        }
    }

    /// Switch prefixing behavior on for conference-mode sessions.
    pub fn set_conference_mode(&mut self, enabled: bool) {
        self.conference_mode = enabled;
    }

    fn push(&mut self, role: Role, content: Content, speaker: Option<Speaker>) {
        let index = self.next_index;
        self.next_index += 1;
        self.messages.push(Message {
            role,
            content,
            speaker,
            index,
        });
    }

    /// Append a user message. In conference mode the text is prefixed
    /// `[CALLER]:`/`[OWNER]:` for downstream LLM consumption.
    pub fn append_user(&mut self, text: &str, speaker: Option<Speaker>) {
        let body = match (self.conference_mode, speaker) {
            (true, Some(s)) => format!("{} {text}", s.prefix()),
            _ => text.to_string(),
        };
        self.push(Role::User, Content::Text(body), speaker);
    }

    /// Resolve a raw diarization id to a conference speaker slot: the
    /// first id seen becomes `caller`, the next distinct id becomes
    /// `owner`. A third distinct id is ignored with a log (§9 open
    /// question resolved: dropped rather than downgraded, see
    /// DESIGN.md).
    pub fn resolve_speaker(&mut self, raw_diarization_id: &str) -> Option<Speaker> {
        if let Some(bound) = self.speaker_bindings.get(raw_diarization_id) {
            return Some(*bound);
        }
        let caller_bound = self.speaker_bindings.values().any(|s| *s == Speaker::Caller);
        let owner_bound = self.speaker_bindings.values().any(|s| *s == Speaker::Owner);
        let assigned = if !caller_bound {
            Some(Speaker::Caller)
        } else if !owner_bound {
            Some(Speaker::Owner)
        } else {
            tracing::warn!(
                diarization_id = raw_diarization_id,
                "third distinct speaker id ignored"
            );
            None
        };
        if let Some(speaker) = assigned {
            self.speaker_bindings
                .insert(raw_diarization_id.to_string(), speaker);
        }
        assigned
    }

    /// Reset the partial assistant buffer.
    pub fn start_assistant(&mut self) {
        self.partial = Some(PartialAssistant::default());
    }

    /// Append a delta to the partial assistant buffer.
    pub fn extend_assistant(&mut self, delta: &str) {
        if let Some(partial) = self.partial.as_mut() {
            partial.text.push_str(delta);
        }
    }

    /// If the partial assistant buffer is non-empty, append it as a
    /// finalized message and clear it.
    pub fn finish_assistant(&mut self) {
        if let Some(partial) = self.partial.take() {
            if !partial.text.is_empty() {
                self.push(Role::Assistant, Content::Text(partial.text), None);
            }
        }
    }

    /// Finalize an interrupted partial assistant buffer: if its length
    /// is at least [`INTERRUPTED_MIN_LEN`] codepoints, append it with a
    /// trailing ` [interrupted]` suffix; otherwise drop it silently.
    pub fn finish_assistant_interrupted(&mut self) {
        if let Some(partial) = self.partial.take() {
            if partial.text.chars().count() >= INTERRUPTED_MIN_LEN {
                let text = format!("{} [interrupted]", partial.text);
                self.push(Role::Assistant, Content::Text(text), None);
            }
        }
    }

    /// Append a structured assistant message (text and/or tool calls).
    pub fn add_assistant_structured(&mut self, parts: Vec<Part>) {
        self.push(Role::ToolCall, Content::Structured(parts), None);
    }

    /// Append a tool-result message.
    pub fn add_tool_results(&mut self, results: Vec<ToolResultEntry>) {
        self.push(Role::ToolResult, Content::ToolResults(results), None);
    }

    /// A copy of the log suitable for handing to the language service,
    /// bounded to `max_messages` most-recent entries.
    pub fn snapshot(&self, max_messages: usize) -> Vec<Message> {
        let len = self.messages.len();
        let start = len.saturating_sub(max_messages);
        self.messages[start..].to_vec()
    }

    /// The last user message's speaker, inspected by whichever speaker
    /// tag was attached at append time.
    pub fn last_speaker(&self) -> Option<Speaker> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .and_then(|m| m.speaker)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn has_partial_assistant(&self) -> bool {
        self.partial.is_some()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

//! Drives a [`LlmEventStream`] to completion, fanning events to the
//! Conversation Model and a text sink (normally the TTS adapter).
//!
//! The driver is cancellable at any suspension point: cancelling the
//! token passed to [`LanguageService::stream`] is expected to make the
//! stream itself yield [`LlmEvent::Abort`] and terminate; `run` also
//! independently observes `cancel` between polls so a provider that
//! ignores cancellation does not wedge the driver.

use std::collections::HashSet;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::conversation::{Conversation, Part, ToolResultEntry};

use super::events::{FinishReason, LlmEvent};
use super::provider::LlmEventStream;

/// Executes a tool call on behalf of the driver. The language service
/// itself only ever produces `tool-call` events (see crate-level scope
/// notes: tool execution is a Session-side effect, never the external
/// provider's concern); when an executor is supplied the driver resolves
/// each call locally instead of waiting for a `tool-result` to arrive in
/// the stream.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, name: &str, args: &str) -> Result<String, String>;
}

/// How the driven stream ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverOutcome {
    /// Finished normally; `had_text` is true if at least one text delta
    /// was produced (the orchestrator uses this to decide whether to
    /// transition to SPEAKING at all).
    Finished {
        reason: FinishReason,
        had_text: bool,
    },
    /// The provider reported an error.
    Error { cause: String },
    /// Cancelled (interruption or session cleanup).
    Aborted,
}

/// Drive `stream` to completion. `on_text_delta` is invoked with each
/// text fragment (and only the first call also signals "start speaking"
/// to the caller by its return value). `conversation` receives tool
/// calls/results and the partial-assistant buffer as defined by
/// `Conversation`'s contract.
pub async fn run(
    mut stream: LlmEventStream,
    conversation: &mut Conversation,
    cancel: CancellationToken,
    mut on_text_delta: impl FnMut(&str),
    tool_executor: Option<&dyn ToolExecutor>,
) -> DriverOutcome {
    let mut started_assistant = false;
    let mut had_text = false;
    let mut pending_parts: Vec<Part> = Vec::new();
    let mut locally_resolved: HashSet<String> = HashSet::new();

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("llm driver observed external cancellation");
                flush_pending(conversation, &mut pending_parts);
                return DriverOutcome::Aborted;
            }
            maybe_event = stream.next() => maybe_event,
        };

        let Some(event) = event else {
            flush_pending(conversation, &mut pending_parts);
            return DriverOutcome::Finished {
                reason: FinishReason::Other,
                had_text,
            };
        };

        match event {
            LlmEvent::Start { request_id } => {
                debug!(request_id, "llm stream started");
            }
            LlmEvent::TextDelta { text, .. } => {
                if !started_assistant {
                    conversation.start_assistant();
                    started_assistant = true;
                }
                had_text = true;
                conversation.extend_assistant(&text);
                on_text_delta(&text);
            }
            LlmEvent::TextStart { .. } | LlmEvent::TextEnd { .. } => {}
            LlmEvent::ReasoningStart | LlmEvent::ReasoningEnd => {}
            LlmEvent::ReasoningDelta { text } => {
                debug!(reasoning = %text, "llm reasoning delta (not sent to TTS)");
            }
            LlmEvent::ToolCall { id, name, args } => {
                info!(call_id = %id, tool = %name, "llm requested tool call");
                pending_parts.push(Part::ToolCall {
                    call_id: id.clone(),
                    name: name.clone(),
                    args: args.clone(),
                });
                if let Some(executor) = tool_executor {
                    flush_pending(conversation, &mut pending_parts);
                    let payload = match executor.execute(&name, &args).await {
                        Ok(payload) => payload,
                        Err(cause) => {
                            warn!(call_id = %id, cause = %cause, "tool execution failed");
                            format!("error: {cause}")
                        }
                    };
                    conversation.add_tool_results(vec![ToolResultEntry {
                        call_id: id.clone(),
                        payload,
                    }]);
                    locally_resolved.insert(id);
                }
            }
            LlmEvent::ToolResult { id, payload } => {
                flush_pending(conversation, &mut pending_parts);
                if !locally_resolved.remove(&id) {
                    conversation.add_tool_results(vec![ToolResultEntry {
                        call_id: id,
                        payload,
                    }]);
                }
            }
            LlmEvent::ToolError { id, cause } => {
                flush_pending(conversation, &mut pending_parts);
                if !locally_resolved.remove(&id) {
                    warn!(call_id = %id, cause = %cause, "tool execution failed");
                    conversation.add_tool_results(vec![ToolResultEntry {
                        call_id: id,
                        payload: format!("error: {cause}"),
                    }]);
                }
            }
            LlmEvent::Finish { reason } => {
                flush_pending(conversation, &mut pending_parts);
                if started_assistant {
                    conversation.finish_assistant();
                }
                return DriverOutcome::Finished { reason, had_text };
            }
            LlmEvent::Error { cause } => {
                warn!(cause = %cause, "llm stream error");
                flush_pending(conversation, &mut pending_parts);
                return DriverOutcome::Error { cause };
            }
            LlmEvent::Abort => {
                flush_pending(conversation, &mut pending_parts);
                return DriverOutcome::Aborted;
            }
        }
    }
}

fn flush_pending(conversation: &mut Conversation, pending_parts: &mut Vec<Part>) {
    if !pending_parts.is_empty() {
        conversation.add_assistant_structured(std::mem::take(pending_parts));
    }
}

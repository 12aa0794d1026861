//! The boundary contract with the external language service.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use tokio_util::sync::CancellationToken;

use super::error::LlmError;
use super::events::LlmEvent;
use super::message::Message;

/// A tool's JSON-schema declaration, as handed to the language service.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A boxed stream of normalized events.
pub type LlmEventStream = Pin<Box<dyn Stream<Item = LlmEvent> + Send>>;

/// The language-service boundary contract. Implementations normalize a
/// specific provider's wire stream to [`LlmEvent`]s and must observe
/// `cancel` at every suspension point.
#[async_trait]
pub trait LanguageService: Send + Sync {
    /// A human-readable provider name, for logging.
    fn name(&self) -> &str;

    /// Open a streaming generation for `messages`, offering `tools` to
    /// the model, cancellable via `cancel`.
    async fn stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        cancel: CancellationToken,
    ) -> Result<LlmEventStream, LlmError>;
}

//! Error types for the voice-agent session runtime.

/// Top-level error type for the session runtime.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Audio frame decode/encode error.
    #[error("audio error: {0}")]
    Audio(String),

    /// STT/TTS adapter error.
    #[error("speech error: {0}")]
    Speech(String),

    /// Language service / LLM driver error.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Telephony stream or control-plane error.
    #[error("telephony error: {0}")]
    Telephony(String),

    /// Conference coordination error.
    #[error("conference error: {0}")]
    Conference(String),

    /// Response gatekeeper error.
    #[error("gatekeeper error: {0}")]
    Gatekeeper(String),

    /// Appointment persistence error.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<crate::llm::error::LlmError> for CoreError {
    fn from(err: crate::llm::error::LlmError) -> Self {
        Self::Llm(err.to_string())
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, CoreError>;

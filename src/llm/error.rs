//! Error types for the LLM stream driver.
//!
//! Each variant carries a stable error code (SCREAMING_SNAKE_CASE)
//! included in the Display output and accessible via [`LlmError::code()`].

/// Errors produced by the language-service stream driver.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Invalid or missing configuration.
    #[error("[CONFIG_INVALID] {0}")]
    ConfigError(String),

    /// Request to the language service failed.
    #[error("[REQUEST_FAILED] {0}")]
    RequestError(String),

    /// Streaming response encountered an error.
    #[error("[STREAM_FAILED] {0}")]
    StreamError(String),

    /// Tool execution failed.
    #[error("[TOOL_FAILED] {0}")]
    ToolError(String),

    /// Request or operation timed out.
    #[error("[TIMEOUT] {0}")]
    Timeout(String),

    /// Provider-specific error not covered by other variants.
    #[error("[PROVIDER_ERROR] {0}")]
    ProviderError(String),
}

impl LlmError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "CONFIG_INVALID",
            Self::RequestError(_) => "REQUEST_FAILED",
            Self::StreamError(_) => "STREAM_FAILED",
            Self::ToolError(_) => "TOOL_FAILED",
            Self::Timeout(_) => "TIMEOUT",
            Self::ProviderError(_) => "PROVIDER_ERROR",
        }
    }
}

/// Convenience alias for LLM driver results.
pub type Result<T> = std::result::Result<T, LlmError>;

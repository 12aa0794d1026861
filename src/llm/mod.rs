//! Language-service streaming contract and driver.
//!
//! The core never speaks a provider's wire protocol directly: a
//! [`provider::LanguageService`] implementation normalizes provider
//! output to [`events::LlmEvent`], and [`driver::run`] fans that
//! normalized stream to the Conversation Model and a text sink.

pub mod driver;
pub mod error;
pub mod events;
pub mod message;
pub mod provider;

pub use driver::{DriverOutcome, ToolExecutor};
pub use error::LlmError;
pub use events::{FinishReason, LlmEvent};
pub use message::Message;
pub use provider::{LanguageService, LlmEventStream, ToolDefinition};

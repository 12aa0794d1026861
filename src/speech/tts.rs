//! TTS adapter contract.
//!
//! The orchestrator treats `flushed` as authoritative completion of a
//! spoken response — it is the signal that every audio frame
//! corresponding to previously sent text has been emitted.

use async_trait::async_trait;

use crate::error::CoreError;

/// Events delivered to the orchestrator by the TTS adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TtsEvent {
    Open,
    /// A synthesized μ-law audio frame.
    Audio(Vec<u8>),
    /// All previously queued audio has been emitted.
    Flushed,
    Error(String),
    Close,
}

/// Configuration accepted when opening a TTS stream.
#[derive(Debug, Clone)]
pub struct TtsOptions {
    pub model_id: String,
    pub sample_rate_hz: u32,
}

impl Default for TtsOptions {
    fn default() -> Self {
        Self {
            model_id: String::new(),
            sample_rate_hz: 8_000,
        }
    }
}

/// Duplex streaming contract with a TTS provider.
#[async_trait]
pub trait TtsAdapter: Send + Sync {
    /// Queue a text chunk for synthesis.
    async fn send_text(&mut self, chunk: &str) -> Result<(), CoreError>;

    /// Request that all queued text be synthesized and a `Flushed`
    /// event delivered once drained.
    async fn flush(&mut self) -> Result<(), CoreError>;

    /// Drop any queued (not-yet-emitted) audio without closing the
    /// stream.
    async fn clear(&mut self) -> Result<(), CoreError>;

    /// Close the adapter. Idempotent.
    async fn close(&mut self);

    /// Receive the next event, or `None` once the stream is closed.
    async fn next_event(&mut self) -> Option<TtsEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    /// An in-process fake used by orchestrator tests elsewhere in the
    /// crate; kept here as the adapter's own conformance check.
    #[derive(Default)]
    struct FakeTts {
        queued_text: Mutex<Vec<String>>,
        events: Mutex<VecDeque<TtsEvent>>,
    }

    #[async_trait]
    impl TtsAdapter for FakeTts {
        async fn send_text(&mut self, chunk: &str) -> Result<(), CoreError> {
            self.queued_text.lock().await.push(chunk.to_string());
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), CoreError> {
            self.events.lock().await.push_back(TtsEvent::Flushed);
            Ok(())
        }

        async fn clear(&mut self) -> Result<(), CoreError> {
            self.queued_text.lock().await.clear();
            Ok(())
        }

        async fn close(&mut self) {
            self.events.lock().await.push_back(TtsEvent::Close);
        }

        async fn next_event(&mut self) -> Option<TtsEvent> {
            self.events.lock().await.pop_front()
        }
    }

    #[tokio::test]
    async fn flush_delivers_flushed_event() {
        let mut tts = FakeTts::default();
        tts.send_text("hello").await.expect("send");
        tts.flush().await.expect("flush");
        assert_eq!(tts.next_event().await, Some(TtsEvent::Flushed));
    }

    #[tokio::test]
    async fn clear_drops_queued_text() {
        let mut tts = FakeTts::default();
        tts.send_text("hello").await.expect("send");
        tts.clear().await.expect("clear");
        assert!(tts.queued_text.lock().await.is_empty());
    }

    #[tokio::test]
    async fn close_is_observable_via_next_event() {
        let mut tts = FakeTts::default();
        tts.close().await;
        assert_eq!(tts.next_event().await, Some(TtsEvent::Close));
    }
}

//! STT adapter contract.
//!
//! Codec is fixed at μ-law 8 kHz mono; endpointing silence threshold is
//! configured around 500 ms. The orchestrator assumes at most one
//! delivered final utterance may be in-flight at a time per session: the
//! adapter accumulates final fragments into a single utterance until
//! `speech_final` is set, then delivers one joined transcript carrying
//! the leading speaker id (if diarization is enabled).

use async_trait::async_trait;

use crate::error::CoreError;

/// A transcript delivered by the STT adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub is_final: bool,
    pub speech_final: bool,
    pub text: String,
    pub speaker_id: Option<String>,
}

/// Events delivered to the orchestrator by the STT adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SttEvent {
    Open,
    Transcript(Transcript),
    Error(String),
    Close,
}

/// Configuration accepted when opening an STT stream.
#[derive(Debug, Clone)]
pub struct SttOptions {
    pub model_id: String,
    pub endpointing_ms: u32,
    pub diarization: bool,
}

impl Default for SttOptions {
    fn default() -> Self {
        Self {
            model_id: String::new(),
            endpointing_ms: 500,
            diarization: false,
        }
    }
}

/// Duplex streaming contract with an STT provider. Implementations feed
/// inbound μ-law frames in and deliver [`SttEvent`]s out; the exact
/// transport (WebSocket, gRPC, ...) is the adapter's concern.
#[async_trait]
pub trait SttAdapter: Send + Sync {
    /// Forward one inbound audio frame for transcription.
    async fn send_frame(&mut self, frame: &[u8]) -> Result<(), CoreError>;

    /// Receive the next event, or `None` once the stream is closed.
    async fn next_event(&mut self) -> Option<SttEvent>;

    /// Close the adapter. Idempotent.
    async fn close(&mut self);
}

/// Accumulates STT fragments into a single joined utterance until
/// `speech_final` arrives, per the endpointing contract above.
#[derive(Debug, Default)]
pub struct UtteranceAccumulator {
    buffer: String,
    leading_speaker_id: Option<String>,
}

impl UtteranceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transcript fragment. Returns `Some(joined_text)` once
    /// `speech_final` is observed; otherwise accumulates and returns
    /// `None`.
    pub fn accumulate(&mut self, transcript: &Transcript) -> Option<(String, Option<String>)> {
        if !transcript.is_final {
            return None;
        }
        if self.leading_speaker_id.is_none() {
            self.leading_speaker_id = transcript.speaker_id.clone();
        }
        if !self.buffer.is_empty() {
            self.buffer.push(' ');
        }
        self.buffer.push_str(&transcript.text);

        if transcript.speech_final {
            let text = std::mem::take(&mut self.buffer);
            let speaker = self.leading_speaker_id.take();
            Some((text, speaker))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(text: &str, speech_final: bool, speaker: Option<&str>) -> Transcript {
        Transcript {
            is_final: true,
            speech_final,
            text: text.to_string(),
            speaker_id: speaker.map(str::to_string),
        }
    }

    #[test]
    fn interim_fragments_are_buffered_not_delivered() {
        let mut acc = UtteranceAccumulator::new();
        assert!(acc.accumulate(&fragment("hello", false, None)).is_none());
    }

    #[test]
    fn speech_final_joins_accumulated_fragments() {
        let mut acc = UtteranceAccumulator::new();
        acc.accumulate(&fragment("hi", false, Some("spk-1")));
        let result = acc.accumulate(&fragment("there", true, Some("spk-1")));
        assert_eq!(result, Some(("hi there".to_string(), Some("spk-1".to_string()))));
    }

    #[test]
    fn leading_speaker_id_is_the_first_observed() {
        let mut acc = UtteranceAccumulator::new();
        acc.accumulate(&fragment("hi", false, Some("spk-1")));
        let result = acc.accumulate(&fragment("there", true, Some("spk-2")));
        assert_eq!(result.unwrap().1, Some("spk-1".to_string()));
    }

    #[test]
    fn buffer_resets_after_delivery() {
        let mut acc = UtteranceAccumulator::new();
        acc.accumulate(&fragment("first utterance", true, None));
        acc.accumulate(&fragment("second", true, None));
        let result = acc.accumulate(&fragment("utterance", true, None));
        assert_eq!(result.unwrap().0, "second utterance");
    }

    #[test]
    fn single_fragment_utterance() {
        let mut acc = UtteranceAccumulator::new();
        let result = acc.accumulate(&fragment("stop", true, None));
        assert_eq!(result, Some(("stop".to_string(), None)));
    }
}

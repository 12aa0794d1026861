//! Duplex streaming contracts consumed from the Speech Service: the
//! core consumes transcripts and produces synthesized frames,
//! independent of the underlying STT/TTS provider.

pub mod stt;
pub mod tts;

pub use stt::{SttAdapter, SttEvent, Transcript};
pub use tts::{TtsAdapter, TtsEvent};

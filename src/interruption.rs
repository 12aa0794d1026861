//! Defense-in-depth interruption detection over raw telephony audio.
//!
//! The authoritative barge-in path is a transcript arriving while the
//! session is SPEAKING (see [`crate::session::orchestrator`]); this
//! detector is a pure, cheap fallback over the raw μ-law frame, kept
//! behind an explicit opt-in since a conformant deployment may rely on
//! the STT endpointing path alone.

use std::time::{Duration, Instant};

/// Minimum elapsed time between two positive detections.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// μ-law silence level (zero-crossing of the encoded byte range).
const SILENCE_LEVEL: i16 = 127;

/// Minimum deviation from silence for a sample to count as "active".
const ACTIVITY_DEVIATION: i16 = 3;

/// Fraction of samples in a frame that must be active for the frame
/// itself to be considered active.
const ACTIVE_RATIO_THRESHOLD: f32 = 0.05;

/// Returns `true` if the given μ-law frame contains speech-like activity:
/// the fraction of bytes whose value deviates from the silence level
/// (127) by more than 3 exceeds 5%.
pub fn frame_is_active(frame: &[u8]) -> bool {
    if frame.is_empty() {
        return false;
    }
    let active = frame
        .iter()
        .filter(|&&b| (i16::from(b) - SILENCE_LEVEL).abs() > ACTIVITY_DEVIATION)
        .count();
    (active as f32 / frame.len() as f32) > ACTIVE_RATIO_THRESHOLD
}

/// Debounced interruption detector. Holds no state beyond the last
/// positive-detection timestamp and a running count.
pub struct InterruptionDetector {
    last_positive: Option<Instant>,
    total_count: u64,
}

impl InterruptionDetector {
    pub fn new() -> Self {
        Self {
            last_positive: None,
            total_count: 0,
        }
    }

    /// Returns `true` only if `frame` is active *and* at least
    /// [`DEBOUNCE`] has elapsed since the last positive detection.
    pub fn should_interrupt(&mut self, frame: &[u8]) -> bool {
        if !frame_is_active(frame) {
            return false;
        }
        let now = Instant::now();
        let debounced = self
            .last_positive
            .is_none_or(|prev| now.duration_since(prev) >= DEBOUNCE);
        if debounced {
            self.last_positive = Some(now);
            self.total_count += 1;
        }
        debounced
    }

    /// Total positive detections observed so far.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }
}

impl Default for InterruptionDetector {
    fn default() -> Self {
        Self::new()
    }
}

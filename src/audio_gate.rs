//! The one-bit valve controlling egress of synthesized audio.
//!
//! Gate decisions are strictly synchronous and local: no I/O beyond the
//! single frame write the caller performs with the returned permission.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Minimum gap between two `clear_downstream` commands actually sent.
const CLEAR_DEBOUNCE: Duration = Duration::from_millis(50);

/// Number of repeated clear commands issued per `clear_downstream` call,
/// for delivery reliability over the telephony uplink.
pub const CLEAR_REPEAT_COUNT: usize = 3;

/// Controls whether synthesized audio frames may egress to the
/// telephony stream.
pub struct AudioGate {
    enabled: AtomicBool,
    last_cleared: Mutex<Option<Instant>>,
}

impl AudioGate {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            last_cleared: Mutex::new(None),
        }
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Attempt to send a frame. Returns `false` (dropped) when the gate
    /// is closed.
    pub fn send(&self, frame: &[u8], mut emit: impl FnMut(&[u8])) -> bool {
        if !self.is_enabled() {
            return false;
        }
        emit(frame);
        true
    }

    /// Issue a "clear downstream buffer" command, idempotent and
    /// debounced at a 50 ms minimum gap. When not debounced, invokes
    /// `emit_clear` [`CLEAR_REPEAT_COUNT`] times for uplink reliability.
    pub fn clear_downstream(&self, mut emit_clear: impl FnMut()) {
        let now = Instant::now();
        let mut last = self.lock();
        if let Some(prev) = *last {
            if now.duration_since(prev) < CLEAR_DEBOUNCE {
                return;
            }
        }
        *last = Some(now);
        drop(last);
        for _ in 0..CLEAR_REPEAT_COUNT {
            emit_clear();
        }
    }

    /// `disable()` followed by `clear_downstream()`.
    pub fn stop_immediately(&self, emit_clear: impl FnMut()) {
        self.disable();
        self.clear_downstream(emit_clear);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        match self.last_cleared.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for AudioGate {
    fn default() -> Self {
        Self::new()
    }
}

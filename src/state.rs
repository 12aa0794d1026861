//! Per-session call state machine.
//!
//! ```text
//!            init
//!   IDLE ─────────────► LISTENING ◄────────────────┐
//!     ▲                    │  ▲                     │
//!     │          final     │  │      interruption   │
//!     │        transcript  │  │      processed       │
//!     │                    ▼  │                     │
//!     │                 THINKING                     │
//!     │                    │                         │
//!     │         first text delta                     │
//!     │          or no-text/error                     │
//!     │                    ▼                         │
//!     │                 SPEAKING ──interruption──► INTERRUPTED
//!     │                    │                                 │
//!     │             drained/finished                         │
//!     │                    └─────────────────────────────────┘
//!     │
//!     └──────────────────────── teardown (any state) ─────────┘
//! ```

use std::sync::Mutex;
use std::time::Instant;

use tracing::warn;

/// Call phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// No active call leg yet.
    Idle,
    /// Waiting for caller speech.
    Listening,
    /// Waiting for the language service to produce a response.
    Thinking,
    /// Synthesized audio is being gated out to the telephony stream.
    Speaking,
    /// An interruption is being processed.
    Interrupted,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Listening => write!(f, "listening"),
            Self::Thinking => write!(f, "thinking"),
            Self::Speaking => write!(f, "speaking"),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// A recorded transition.
#[derive(Debug, Clone)]
pub struct Transition {
    pub from: State,
    pub to: State,
    pub reason: String,
    pub at: Instant,
}

/// Maximum number of transitions kept in `history()`; older entries are
/// dropped to bound memory on long-running calls.
const HISTORY_BOUND: usize = 256;

fn is_legal(from: State, to: State) -> bool {
    use State::*;
    if to == Idle {
        return true; // teardown is legal from any state
    }
    matches!(
        (from, to),
        (Idle, Listening)
            | (Listening, Thinking)
            | (Thinking, Speaking)
            | (Thinking, Listening)
            | (Speaking, Listening)
            | (Speaking, Interrupted)
            | (Interrupted, Listening)
    )
}

type Listener = Box<dyn Fn(&Transition) + Send + Sync>;

/// Enforces the legal call-phase transition set and records a bounded
/// history. Transitions fire listeners synchronously; listeners must not
/// block.
pub struct StateMachine {
    inner: Mutex<Inner>,
}

struct Inner {
    current: State,
    history: Vec<Transition>,
    listeners: Vec<Listener>,
}

impl StateMachine {
    /// Create a new machine starting at `Idle`.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                current: State::Idle,
                history: Vec::new(),
                listeners: Vec::new(),
            }),
        }
    }

    /// Current phase.
    pub fn current(&self) -> State {
        self.lock().current
    }

    /// Attempt a transition. Returns `true` if accepted. Illegal
    /// transitions are rejected and logged; rejection is not fatal.
    pub fn attempt(&self, to: State, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        let mut inner = self.lock();
        let from = inner.current;
        if !is_legal(from, to) {
            warn!(%from, %to, %reason, "illegal state transition rejected");
            return false;
        }
        inner.current = to;
        let transition = Transition {
            from,
            to,
            reason,
            at: Instant::now(),
        };
        inner.history.push(transition.clone());
        if inner.history.len() > HISTORY_BOUND {
            let overflow = inner.history.len() - HISTORY_BOUND;
            inner.history.drain(0..overflow);
        }
        for listener in &inner.listeners {
            listener(&transition);
        }
        true
    }

    /// Register a listener invoked synchronously on every accepted
    /// transition.
    pub fn subscribe(&self, listener: impl Fn(&Transition) + Send + Sync + 'static) {
        self.lock().listeners.push(Box::new(listener));
    }

    /// Bounded transition history, oldest first.
    pub fn history(&self) -> Vec<Transition> {
        self.lock().history.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

//! Map from telephony stream id to Session. The registry is the single
//! owner of Session lifetime; no other component may destroy a Session.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use tracing::info;

use super::orchestrator::{Session, SessionHandles};

/// A Session guarded for exclusive, serialized access — callers lock it
/// for the duration of one orchestrator operation, which is exactly the
/// "single-consumer event loop per Session" concurrency model.
pub type SharedSession = Arc<AsyncMutex<Session>>;

/// Owns every live Session, keyed by telephony stream id.
pub struct SessionRegistry {
    sessions: std::sync::Mutex<HashMap<String, SharedSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Create and register a new Session for `stream_id`. Returns the
    /// existing Session unchanged if `stream_id` is already registered
    /// (callers should use [`Self::replace_adapters`] for reconnection).
    pub fn create(&self, stream_id: &str, session: Session) -> SharedSession {
        let mut sessions = self.lock();
        sessions
            .entry(stream_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(session)))
            .clone()
    }

    pub fn get(&self, stream_id: &str) -> Option<SharedSession> {
        self.lock().get(stream_id).cloned()
    }

    pub fn has(&self, stream_id: &str) -> bool {
        self.lock().contains_key(stream_id)
    }

    /// Swap in new adapter handles for an already-known stream id,
    /// preserving conversation, state, and speaker bindings. Returns
    /// `true` if a Session existed to swap.
    pub async fn replace_adapters(&self, stream_id: &str, handles: SessionHandles) -> bool {
        let Some(shared) = self.get(stream_id) else {
            return false;
        };
        let mut session = shared.lock().await;
        session.swap_adapters(handles);
        info!(stream_id, "adapter swap applied on reconnection");
        true
    }

    /// Delete a Session: triggers `cleanup()` and removes the entry.
    pub async fn delete(&self, stream_id: &str) {
        let removed = self.lock().remove(stream_id);
        if let Some(shared) = removed {
            let mut session = shared.lock().await;
            session.cleanup().await;
        }
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SharedSession>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//! Per-session conversation state

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

use crate::memory::MemoryManager;

/// State that survives between turns of one session.
pub struct SessionContext {
    pub session_id: String,
    pub memory: MemoryManager,
}

impl SessionContext {
    pub fn new(memory: MemoryManager) -> Self {
        Self {
            session_id: memory.session_id().to_string(),
            memory,
        }
    }
}

pub type SharedSession = Arc<AsyncMutex<SessionContext>>;

/// Session-keyed pool. Each entry sits behind its own async mutex, so turns
/// within a session run one at a time while separate sessions interleave.
#[derive(Default)]
pub struct SessionPool {
    sessions: Mutex<HashMap<String, SharedSession>>,
}

impl SessionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, session_id: &str) -> Option<SharedSession> {
        self.sessions.lock().get(session_id).cloned()
    }

    /// Return the session for `session_id`, creating it with `create` on first
    /// use.
    pub fn get_or_insert_with(
        &self,
        session_id: &str,
        create: impl FnOnce() -> SessionContext,
    ) -> SharedSession {
        self.sessions
            .lock()
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(create())))
            .clone()
    }

    /// Drop a session. A turn already holding it finishes on its own handle.
    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.lock().remove(session_id).is_some()
    }
}

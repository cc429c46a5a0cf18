use crate::error::Result;
use crate::models::Session;
use std::collections::HashMap;
use std::sync::Mutex;

/// Trait for session storage backends
pub trait SessionStore: Send + Sync {
    /// Load a session by id
    fn get(&self, session_id: &str) -> Result<Option<Session>>;

    /// Save a session, replacing any stored copy
    fn put(&self, session: &Session) -> Result<()>;

    /// Find the most recent session that has not expired
    fn find_recent(&self) -> Option<Session>;

    /// Clear all sessions
    fn clear_all(&self) -> Result<()>;
}

/// Process-local store, for hosts that persist elsewhere and for tests.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        // A panic while holding the lock cannot leave a half-written session.
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.lock().get(session_id).cloned())
    }

    fn put(&self, session: &Session) -> Result<()> {
        self.lock()
            .insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    fn find_recent(&self) -> Option<Session> {
        self.lock()
            .values()
            .max_by_key(|s| s.last_updated)
            .cloned()
    }

    fn clear_all(&self) -> Result<()> {
        self.lock().clear();
        Ok(())
    }
}

use super::storage::SessionStore;
use crate::error::Result;
use crate::models::Session;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Shared handle to one live session. Holding the guard from `lock` is what
/// makes a turn exclusive for that session.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<AsyncMutex<Session>>,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(AsyncMutex::new(session)),
        }
    }

    pub async fn lock(&self) -> OwnedMutexGuard<Session> {
        self.inner.clone().lock_owned().await
    }

    pub async fn snapshot(&self) -> Session {
        self.inner.lock().await.clone()
    }
}

/// Live sessions by id, loaded from the backing store on first use.
/// Distinct sessions never contend with each other.
pub struct SessionPool {
    store: Arc<dyn SessionStore>,
    live: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionPool {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            live: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Register a freshly created session.
    pub fn open(&self, session: Session) -> SessionHandle {
        let id = session.session_id.clone();
        let handle = SessionHandle::new(session);
        self.live_map().insert(id, handle.clone());
        handle
    }

    /// Live handle for `session_id`, loading it from the store if needed.
    pub fn get(&self, session_id: &str) -> Result<Option<SessionHandle>> {
        if let Some(handle) = self.live_map().get(session_id) {
            return Ok(Some(handle.clone()));
        }

        let Some(session) = self.store.get(session_id)? else {
            return Ok(None);
        };
        let mut live = self.live_map();
        // Another caller may have loaded it while the store was read.
        let handle = live
            .entry(session_id.to_string())
            .or_insert_with(|| SessionHandle::new(session))
            .clone();
        Ok(Some(handle))
    }

    /// Forget a live session. The stored copy is left alone.
    pub fn close(&self, session_id: &str) -> Option<SessionHandle> {
        self.live_map().remove(session_id)
    }

    fn live_map(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionHandle>> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

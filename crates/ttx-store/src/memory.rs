//! In-memory session store

use async_trait::async_trait;
use dashmap::DashMap;
use ttx_engine::{SessionId, SessionSnapshot, SessionStore, StoreError};

/// Concurrent map of snapshots, lost on drop
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<SessionId, SessionSnapshot>,
}

impl MemorySessionStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored session IDs, sorted
    #[must_use]
    pub fn list(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Remove a session; true if it existed
    pub fn delete(&self, id: &SessionId) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Number of stored sessions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// No stored sessions
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, id: &SessionId, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        self.sessions.insert(id.clone(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, id: &SessionId) -> Result<SessionSnapshot, StoreError> {
        self.sessions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

//! JSON-file session store
//!
//! One pretty-printed snapshot per session at `<dir>/<session>.json`.
//! Writes go to a temporary sibling first and are renamed into place, so a
//! crash never leaves a half-written snapshot behind. Reads are served from
//! a moka cache that is refreshed on every save.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use ttx_engine::{SessionId, SessionSnapshot, SessionStore, StoreError};

/// Default number of sessions kept by [`FileSessionStore::prune`]
pub const DEFAULT_MAX_SESSIONS: usize = 10;

const EXTENSION: &str = "json";

/// Listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    /// Session ID
    pub session_id: SessionId,
    /// Scenario the session is bound to
    pub scenario_id: String,
    /// Last save time
    pub saved_at: DateTime<Utc>,
}

impl From<&SessionSnapshot> for SessionSummary {
    fn from(snapshot: &SessionSnapshot) -> Self {
        Self {
            session_id: snapshot.session_id.clone(),
            scenario_id: snapshot.scenario_id.clone(),
            saved_at: snapshot.saved_at,
        }
    }
}

/// Directory of snapshot files with a read cache
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
    cache: Cache<SessionId, SessionSnapshot>,
}

impl FileSessionStore {
    /// Open (and create if needed) a store rooted at `dir`
    ///
    /// # Errors
    /// `StoreError::Io` if the directory cannot be created
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::with_cache_capacity(dir, 256).await
    }

    /// Open with an explicit cache capacity
    ///
    /// # Errors
    /// `StoreError::Io` if the directory cannot be created
    pub async fn with_cache_capacity(
        dir: impl Into<PathBuf>,
        capacity: u64,
    ) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        debug!(dir = %dir.display(), capacity, "opened file session store");
        Ok(Self {
            dir,
            cache: Cache::new(capacity),
        })
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &SessionId) -> Result<PathBuf, StoreError> {
        let key = id.as_str();
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidId(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.{EXTENSION}")))
    }

    async fn read_file(path: &Path) -> Result<SessionSnapshot, StoreError> {
        let raw = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Summaries of every stored session, newest first
    ///
    /// Unreadable files are skipped with a warning.
    ///
    /// # Errors
    /// `StoreError::Io` if the directory cannot be read
    pub async fn list(&self) -> Result<Vec<SessionSummary>, StoreError> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            match Self::read_file(&path).await {
                Ok(snapshot) => summaries.push(SessionSummary::from(&snapshot)),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable snapshot"),
            }
        }
        summaries.sort_by(|a, b| {
            b.saved_at
                .cmp(&a.saved_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        Ok(summaries)
    }

    /// Remove a session; true if it existed
    ///
    /// # Errors
    /// `InvalidId`, or `Io` for failures other than a missing file
    pub async fn delete(&self, id: &SessionId) -> Result<bool, StoreError> {
        let path = self.path_for(id)?;
        self.cache.invalidate(id).await;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(session_id = %id, "deleted session");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Keep the `max_sessions` most recently saved sessions, delete the rest
    ///
    /// Returns the IDs that were removed.
    ///
    /// # Errors
    /// Listing or deletion failures
    pub async fn prune(&self, max_sessions: usize) -> Result<Vec<SessionId>, StoreError> {
        let summaries = self.list().await?;
        let mut removed = Vec::new();
        for summary in summaries.into_iter().skip(max_sessions) {
            if self.delete(&summary.session_id).await? {
                removed.push(summary.session_id);
            }
        }
        if !removed.is_empty() {
            info!(removed = removed.len(), kept = max_sessions, "pruned old sessions");
        }
        Ok(removed)
    }

    /// Number of snapshots currently cached
    #[inline]
    #[must_use]
    pub fn cached_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save(&self, id: &SessionId, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        let path = self.path_for(id)?;
        let tmp = path.with_extension("json.tmp");
        let raw = serde_json::to_string_pretty(snapshot)?;
        fs::write(&tmp, raw).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            warn!(session_id = %id, error = %e, "failed to move snapshot into place");
            return Err(e.into());
        }
        self.cache.insert(id.clone(), snapshot.clone()).await;
        debug!(session_id = %id, path = %path.display(), "saved session");
        Ok(())
    }

    async fn load(&self, id: &SessionId) -> Result<SessionSnapshot, StoreError> {
        let path = self.path_for(id)?;
        if let Some(cached) = self.cache.get(id).await {
            return Ok(cached);
        }
        let snapshot = match Self::read_file(&path).await {
            Ok(snapshot) => snapshot,
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e),
        };
        self.cache.insert(id.clone(), snapshot.clone()).await;
        Ok(snapshot)
    }
}

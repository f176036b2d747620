//! Local sync state and the shared, single-writer policy cache.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PolicySnapshot;

/// Process-local bookkeeping about the last sync. Never sent to the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    /// Whether a snapshot has ever been obtained for the current identity.
    pub configured: bool,
    /// Instant of the last successful refresh. Only moves on success.
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Instant of the last refresh attempt, successful or not.
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Reason the last attempt failed, cleared by the next success.
    pub last_error: Option<String>,
    /// When the server reported the paired configuration deleted. Survives
    /// the reset it triggers; cleared by the next pairing.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Identity, snapshot and sync state. Always read and replaced together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyCache {
    pub identity: Option<String>,
    pub snapshot: Option<Arc<PolicySnapshot>>,
    pub sync: SyncState,
}

impl PolicyCache {
    /// Never paired. Everything non-special is blocked in this state.
    pub fn unconfigured() -> Self {
        Self::default()
    }

    /// Identity adopted, nothing fetched yet.
    pub fn paired(identity: impl Into<String>) -> Self {
        Self {
            identity: Some(identity.into()),
            ..Self::default()
        }
    }

    /// Reset after the server dropped the paired configuration. Identity,
    /// snapshot and sync timestamps are gone; only the deletion is recorded.
    pub fn deleted(at: DateTime<Utc>) -> Self {
        Self {
            sync: SyncState {
                deleted_at: Some(at),
                ..SyncState::default()
            },
            ..Self::default()
        }
    }

    /// A freshly synced cache.
    pub fn synced(snapshot: PolicySnapshot, at: DateTime<Utc>) -> Self {
        Self {
            identity: Some(snapshot.id.clone()),
            snapshot: Some(Arc::new(snapshot)),
            sync: SyncState {
                configured: true,
                last_sync_at: Some(at),
                last_attempt_at: Some(at),
                last_error: None,
                deleted_at: None,
            },
        }
    }

    pub fn is_configured(&self) -> bool {
        self.sync.configured && self.snapshot.is_some()
    }
}

/// Shared handle to the policy cache.
///
/// Every component gets a clone of this handle at construction time. Reads
/// return a cheap copy (the snapshot sits behind an `Arc`); the write methods
/// are crate-private and only the sync client calls them. The lock is never
/// held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SharedCache {
    inner: Arc<RwLock<PolicyCache>>,
}

impl SharedCache {
    pub fn new(cache: PolicyCache) -> Self {
        Self {
            inner: Arc::new(RwLock::new(cache)),
        }
    }

    /// Copy of the current cache contents.
    pub fn view(&self) -> PolicyCache {
        self.read().clone()
    }

    pub fn identity(&self) -> Option<String> {
        self.read().identity.clone()
    }

    /// Replace the whole cache. Last writer wins.
    pub(crate) fn replace(&self, cache: PolicyCache) {
        *self.write() = cache;
    }

    /// Record a failed attempt without touching the snapshot or `last_sync_at`.
    pub(crate) fn record_failure(&self, at: DateTime<Utc>, reason: String) -> SyncState {
        let mut guard = self.write();
        guard.sync.last_attempt_at = Some(at);
        guard.sync.last_error = Some(reason);
        guard.sync.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, PolicyCache> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, PolicyCache> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

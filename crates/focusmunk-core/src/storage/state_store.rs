//! SQLite persistence for the policy cache.
//!
//! Identity, snapshot and sync state live in a single row and are written in
//! one transaction, so a crash can never leave `last_sync_at` pointing at a
//! snapshot that was not committed. After a server-side deletion the row
//! keeps only `deleted_at`.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::data_dir;
use crate::error::StorageError;
use crate::policy::{PolicyCache, PolicySnapshot, SyncState};

/// Persisted policy cache.
pub struct StateStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore").finish_non_exhaustive()
    }
}

impl StateStore {
    /// Open the store at `~/.config/focusmunk/state.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        let dir = data_dir().map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        Self::open_at(&dir.join("state.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory store (for tests and dry runs).
    pub fn open_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        self.conn().execute_batch(
            "CREATE TABLE IF NOT EXISTS client_state (
                id              INTEGER PRIMARY KEY CHECK (id = 1),
                config_id       TEXT,
                snapshot_json   TEXT,
                last_sync_at    TEXT,
                last_attempt_at TEXT,
                last_error      TEXT,
                deleted_at      TEXT
            );",
        )?;
        Ok(())
    }

    /// Load the persisted cache, or an unconfigured cache if nothing is stored.
    pub fn load(&self) -> Result<PolicyCache, StorageError> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT config_id, snapshot_json, last_sync_at, last_attempt_at, last_error, deleted_at
                 FROM client_state WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((config_id, snapshot_json, last_sync_at, last_attempt_at, last_error, deleted_at)) =
            row
        else {
            return Ok(PolicyCache::unconfigured());
        };

        let snapshot = snapshot_json
            .map(|json| serde_json::from_str::<PolicySnapshot>(&json))
            .transpose()
            .map_err(|e| StorageError::Corrupt(format!("snapshot: {e}")))?;

        if config_id.is_none() && snapshot.is_some() {
            return Err(StorageError::Corrupt("snapshot without identity".into()));
        }

        Ok(PolicyCache {
            identity: config_id,
            sync: SyncState {
                configured: snapshot.is_some(),
                last_sync_at: parse_time(last_sync_at)?,
                last_attempt_at: parse_time(last_attempt_at)?,
                last_error,
                deleted_at: parse_time(deleted_at)?,
            },
            snapshot: snapshot.map(Arc::new),
        })
    }

    /// Write the whole cache in one transaction. A cache with neither an
    /// identity nor a recorded deletion clears the store.
    pub fn save(&self, cache: &PolicyCache) -> Result<(), StorageError> {
        if cache.identity.is_none() && cache.sync.deleted_at.is_none() {
            return self.clear();
        }
        let snapshot_json = cache
            .snapshot
            .as_deref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StorageError::Corrupt(format!("snapshot: {e}")))?;

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO client_state
                (id, config_id, snapshot_json, last_sync_at, last_attempt_at, last_error, deleted_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                config_id = excluded.config_id,
                snapshot_json = excluded.snapshot_json,
                last_sync_at = excluded.last_sync_at,
                last_attempt_at = excluded.last_attempt_at,
                last_error = excluded.last_error,
                deleted_at = excluded.deleted_at",
            params![
                cache.identity,
                snapshot_json,
                cache.sync.last_sync_at.map(|t| t.to_rfc3339()),
                cache.sync.last_attempt_at.map(|t| t.to_rfc3339()),
                cache.sync.last_error,
                cache.sync.deleted_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Remove identity, snapshot and sync state together.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.conn().execute("DELETE FROM client_state", [])?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn parse_time(value: Option<String>) -> Result<Option<DateTime<Utc>>, StorageError> {
    value
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| StorageError::Corrupt(format!("timestamp '{s}': {e}")))
        })
        .transpose()
}

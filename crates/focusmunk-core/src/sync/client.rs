//! Sync client: the single writer of the policy cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::bootstrap::BootstrapSignal;
use crate::api::{ApiClient, CreateConfigRequest, FreeTimeResponse, PolicyUpdate};
use crate::error::{ApiError, CoreError, Result, StorageError};
use crate::policy::{PolicyCache, SharedCache};
use crate::storage::StateStore;

/// What a refresh did to the local cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SyncOutcome {
    /// Snapshot replaced and persisted.
    Updated,
    /// The server no longer knows this identity; local state was reset and
    /// the deletion recorded.
    Deleted,
    /// The refresh failed; the last known snapshot stays in use.
    Stale { reason: String },
    /// No identity to refresh.
    Unpaired,
}

/// Pulls the policy from the server and owns every write to the cache.
pub struct SyncClient {
    api: ApiClient,
    cache: SharedCache,
    store: Arc<StateStore>,
    bootstrapped: watch::Sender<bool>,
    signal: BootstrapSignal,
}

impl SyncClient {
    pub fn new(api: ApiClient, cache: SharedCache, store: Arc<StateStore>) -> Self {
        let (bootstrapped, signal) = BootstrapSignal::channel();
        Self {
            api,
            cache,
            store,
            bootstrapped,
            signal,
        }
    }

    /// Read handle to the cache this client writes.
    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Latch the navigation gate waits on before its first decision.
    pub fn bootstrap_signal(&self) -> BootstrapSignal {
        self.signal.clone()
    }

    /// Startup refresh. Opens the bootstrap latch whatever the outcome.
    pub async fn bootstrap(&self) -> SyncOutcome {
        let outcome = self.refresh().await;
        self.bootstrapped.send_replace(true);
        outcome
    }

    /// Refresh on a fixed cadence, forever. The first tick is skipped since
    /// [`Self::bootstrap`] covers startup.
    pub async fn run_periodic(&self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.refresh().await;
        }
    }

    /// Fetch the policy for the current identity and reconcile.
    ///
    /// Never returns an error: transient failures keep the last known
    /// snapshot, a 404 resets to unconfigured.
    pub async fn refresh(&self) -> SyncOutcome {
        let Some(config_id) = self.cache.identity() else {
            tracing::debug!("refresh skipped, client is not paired");
            return SyncOutcome::Unpaired;
        };

        let result = self.api.fetch_config(&config_id).await;
        let now = Utc::now();

        // Pairing may have changed while the request was in flight.
        if self.cache.identity().as_deref() != Some(config_id.as_str()) {
            tracing::debug!(config_id = %config_id, "discarding refresh for a replaced identity");
            return SyncOutcome::Unpaired;
        }

        match result {
            Ok(snapshot) => {
                let cache = synced_cache(&config_id, snapshot, now);
                match self.commit(cache) {
                    Ok(()) => {
                        tracing::debug!(config_id = %config_id, "policy refreshed");
                        SyncOutcome::Updated
                    }
                    Err(err) => {
                        tracing::warn!(config_id = %config_id, error = %err, "could not persist refreshed policy");
                        self.record_failure(now, format!("could not persist policy: {err}"))
                    }
                }
            }
            Err(ApiError::NotFound) => {
                tracing::warn!(config_id = %config_id, "configuration deleted on server, resetting");
                if let Err(err) = self.reset_to(PolicyCache::deleted(now)) {
                    tracing::error!(error = %err, "could not clear persisted state");
                }
                SyncOutcome::Deleted
            }
            Err(err) => {
                tracing::info!(config_id = %config_id, error = %err, "refresh failed, keeping last known policy");
                self.record_failure(now, err.to_string())
            }
        }
    }

    // ── Pairing ──────────────────────────────────────────────────────

    /// Adopt an existing configuration. Nothing is stored unless the server
    /// returns it.
    pub async fn pair(&self, config_id: &str) -> Result<()> {
        let config_id = config_id.trim().to_uppercase();
        let snapshot = self.api.fetch_config(&config_id).await?;
        self.commit(synced_cache(&config_id, snapshot, Utc::now()))?;
        tracing::info!(config_id = %config_id, "paired");
        Ok(())
    }

    /// Create a configuration on the server and pair with it.
    pub async fn create_and_pair(&self, request: &CreateConfigRequest) -> Result<String> {
        let config_id = self.api.create_config(request).await?;
        self.pair(&config_id).await?;
        Ok(config_id)
    }

    /// Forget the identity, snapshot and sync state together.
    pub fn unpair(&self) -> Result<()> {
        self.reset_to(PolicyCache::unconfigured())?;
        tracing::info!("unpaired");
        Ok(())
    }

    // ── Mutating actions (each followed by an immediate refresh) ────

    pub async fn start_free_time(&self) -> Result<FreeTimeResponse> {
        let config_id = self.require_identity()?;
        let result = self.api.start_free_time(&config_id).await;
        self.after_mutation(result).await
    }

    pub async fn end_free_time(&self) -> Result<FreeTimeResponse> {
        let config_id = self.require_identity()?;
        let result = self.api.end_free_time(&config_id).await;
        self.after_mutation(result).await
    }

    /// Suspend enforcement for `hours`. Password-gated on the server.
    pub async fn temporary_disable(&self, password: &str, hours: f64) -> Result<DateTime<Utc>> {
        let config_id = self.require_identity()?;
        let result = self
            .api
            .temporary_disable(&config_id, password, hours)
            .await;
        self.after_mutation(result).await
    }

    pub async fn cancel_disable(&self) -> Result<()> {
        let config_id = self.require_identity()?;
        let result = self.api.cancel_disable(&config_id).await;
        self.after_mutation(result).await
    }

    /// Save settings on the server. Password-gated.
    pub async fn update_policy(&self, password: &str, update: &PolicyUpdate) -> Result<()> {
        let config_id = self.require_identity()?;
        let result = self
            .api
            .update_config(&config_id, password, update)
            .await
            .map(|_| ());
        self.after_mutation(result).await
    }

    pub async fn verify_password(&self, password: &str) -> Result<bool> {
        let config_id = self.require_identity()?;
        Ok(self.api.verify_password(&config_id, password).await?)
    }

    pub async fn change_password(&self, password: &str, new_password: &str) -> Result<()> {
        let config_id = self.require_identity()?;
        Ok(self
            .api
            .change_password(&config_id, password, new_password)
            .await?)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn require_identity(&self) -> Result<String> {
        self.cache.identity().ok_or(CoreError::NotPaired)
    }

    /// Re-sync after a mutation. A 404 also re-syncs so the deletion is
    /// picked up immediately.
    async fn after_mutation<T>(&self, result: Result<T, ApiError>) -> Result<T> {
        let outcome = match &result {
            Ok(_) | Err(ApiError::NotFound) => Some(self.refresh().await),
            Err(_) => None,
        };
        if let Some(outcome) = outcome {
            tracing::debug!(?outcome, "post-mutation refresh");
        }
        Ok(result?)
    }

    /// Persist, then publish. Memory never holds a cache the store rejected.
    fn commit(&self, cache: PolicyCache) -> Result<(), StorageError> {
        self.store.save(&cache)?;
        self.cache.replace(cache);
        Ok(())
    }

    fn reset_to(&self, cache: PolicyCache) -> Result<(), StorageError> {
        // Memory first: a failed write must not leave a stale snapshot live.
        self.cache.replace(cache.clone());
        self.store.save(&cache)
    }

    fn record_failure(&self, at: DateTime<Utc>, reason: String) -> SyncOutcome {
        self.cache.record_failure(at, reason.clone());
        if let Err(err) = self.store.save(&self.cache.view()) {
            tracing::warn!(error = %err, "could not persist sync failure");
        }
        SyncOutcome::Stale { reason }
    }
}

fn synced_cache(
    config_id: &str,
    snapshot: crate::policy::PolicySnapshot,
    at: DateTime<Utc>,
) -> PolicyCache {
    let mut cache = PolicyCache::synced(snapshot, at);
    cache.identity = Some(config_id.to_string());
    cache
}

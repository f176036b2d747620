//! Background service: wires the sync client, evaluator and gate together and
//! dispatches companion-surface messages.
//!
//! The service is driven by three kinds of events: inbound [`Request`]s, the
//! sync timer and the sweep timer. Each handler runs to completion or to its
//! next `.await`; the only shared mutable state is the policy cache.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::ApiClient;
use crate::error::Result;
use crate::gate::{NavigationGate, NavigationHost, Surface, SurfaceId};
use crate::messages::{HostCommand, Request, Response, StateReport};
use crate::policy::SharedCache;
use crate::rules::{BlockReason, RuleEvaluator};
use crate::storage::{Config, StateStore};
use crate::sync::SyncClient;

pub struct BackgroundService {
    sync: Arc<SyncClient>,
    gate: Arc<NavigationGate>,
    host: Arc<dyn NavigationHost>,
}

impl BackgroundService {
    pub fn new(
        sync: Arc<SyncClient>,
        gate: Arc<NavigationGate>,
        host: Arc<dyn NavigationHost>,
    ) -> Self {
        Self { sync, gate, host }
    }

    /// Build every component from `config`, loading the persisted cache
    /// from `store`.
    ///
    /// # Errors
    /// Returns an error if the persisted state cannot be read or the
    /// configured URLs are invalid.
    pub fn from_config(
        config: &Config,
        store: StateStore,
        host: Arc<dyn NavigationHost>,
    ) -> Result<Self> {
        let cache = SharedCache::new(store.load()?);
        let api = ApiClient::new(&config.server.url, config.request_timeout())?;
        let sync = Arc::new(SyncClient::new(api.clone(), cache.clone(), Arc::new(store)));

        let evaluator = RuleEvaluator::default()
            .with_internal_pages([&config.gate.extension_origin, &config.gate.blocked_page]);
        let gate = NavigationGate::new(
            cache,
            Arc::new(evaluator),
            api,
            &config.gate.blocked_page,
            sync.bootstrap_signal(),
        )?;

        Ok(Self::new(sync, Arc::new(gate), host))
    }

    pub fn sync(&self) -> &Arc<SyncClient> {
        &self.sync
    }

    pub fn gate(&self) -> &Arc<NavigationGate> {
        &self.gate
    }

    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::GetState => {
                Response::State(StateReport::from_cache(&self.sync.cache().view(), Utc::now()))
            }
            Request::RefreshConfig => Response::Refreshed(self.sync.refresh().await),
            Request::BlockPage {
                surface,
                url,
                reason,
            } => {
                let reason = reason.unwrap_or(BlockReason::NotAllowed);
                self.gate
                    .block_surface(self.host.as_ref(), surface, &url, reason);
                Response::Ok
            }
            Request::Navigate { surface, url } => {
                let decision = self
                    .gate
                    .on_navigation(self.host.as_ref(), surface, &url)
                    .await;
                Response::Verdict { decision }
            }
            Request::Closed { surface } => {
                self.host.on_closed(surface);
                Response::Ok
            }
        }
    }

    /// Bootstrap, then run the sync and sweep timers. Must be called from
    /// inside a tokio runtime.
    pub fn start(self: &Arc<Self>, sync_interval: Duration, sweep_interval: Duration) -> Vec<JoinHandle<()>> {
        let sync_task = tokio::spawn({
            let service = Arc::clone(self);
            async move {
                let outcome = service.sync.bootstrap().await;
                tracing::info!(?outcome, "bootstrap complete");
                service.sync.run_periodic(sync_interval).await;
            }
        });

        let sweep_task = tokio::spawn({
            let service = Arc::clone(self);
            async move {
                let mut ticker = tokio::time::interval(sweep_interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    service.gate.sweep(service.host.as_ref()).await;
                }
            }
        });

        vec![sync_task, sweep_task]
    }
}

/// [`NavigationHost`] for a browser reached over a message channel.
///
/// Keeps its own table of open surfaces from `navigate`/`closed`
/// notifications and emits [`HostCommand`]s on `commands`.
pub struct BridgeHost {
    surfaces: Mutex<BTreeMap<SurfaceId, String>>,
    commands: mpsc::UnboundedSender<HostCommand>,
}

impl BridgeHost {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostCommand>) {
        let (commands, rx) = mpsc::unbounded_channel();
        let host = Self {
            surfaces: Mutex::new(BTreeMap::new()),
            commands,
        };
        (host, rx)
    }

    fn surfaces(&self) -> MutexGuard<'_, BTreeMap<SurfaceId, String>> {
        self.surfaces.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl NavigationHost for BridgeHost {
    fn open_surfaces(&self) -> Vec<Surface> {
        self.surfaces()
            .iter()
            .map(|(id, url)| Surface {
                id: *id,
                url: url.clone(),
            })
            .collect()
    }

    fn redirect(&self, surface: SurfaceId, target: &str) {
        self.surfaces().insert(surface, target.to_string());
        let command = HostCommand::Redirect {
            surface,
            target: target.to_string(),
        };
        if self.commands.send(command).is_err() {
            tracing::warn!(surface, "browser bridge closed, redirect dropped");
        }
    }

    fn current_url(&self, surface: SurfaceId) -> Option<String> {
        self.surfaces().get(&surface).cloned()
    }

    fn on_navigated(&self, surface: &Surface) {
        self.surfaces().insert(surface.id, surface.url.clone());
    }

    fn on_closed(&self, surface: SurfaceId) {
        self.surfaces().remove(&surface);
    }
}

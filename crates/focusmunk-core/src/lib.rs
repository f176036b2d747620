//! # Focusmunk Core Library
//!
//! Navigation-blocking decision engine for a browsing client. A remote
//! configuration server owns the policy (allow-list, daily free-time budget,
//! temporary disable, content filters); this library keeps a local copy of it
//! and decides, for every navigation, whether the page may load.
//!
//! ## Architecture
//!
//! - **Sync client**: sole writer of the policy cache; pulls the snapshot,
//!   persists it and falls back to the last known policy when offline
//! - **Budget tracker**: projects the free-time counter forward between syncs
//! - **Rule evaluator**: fixed-precedence verdict for one URL
//! - **Content platforms**: secondary checks on creator/title for restricted
//!   pages (YouTube ships built in)
//! - **Navigation gate**: applies verdicts to new navigations and, on a timer,
//!   to surfaces that are already open
//!
//! ## Key Components
//!
//! - [`SyncClient`]: refresh, pairing and policy mutations
//! - [`RuleEvaluator`]: the decision function
//! - [`NavigationGate`]: redirects blocked surfaces
//! - [`BackgroundService`]: message dispatch and timers
//! - [`Config`]: client configuration

pub mod api;
pub mod budget;
pub mod error;
pub mod gate;
pub mod messages;
pub mod policy;
pub mod rules;
pub mod service;
pub mod storage;
pub mod sync;

pub use api::ApiClient;
pub use error::{ApiError, ConfigError, CoreError, StorageError};
pub use gate::{NavigationGate, NavigationHost, Surface, SurfaceId};
pub use messages::{HostCommand, Request, Response, StateReport};
pub use policy::{DailyBudget, PolicyCache, PolicySnapshot, SharedCache, SyncState};
pub use rules::{AllowReason, BlockReason, Decision, RuleEvaluator};
pub use service::{BackgroundService, BridgeHost};
pub use storage::{Config, StateStore};
pub use sync::{BootstrapSignal, SyncClient, SyncOutcome};

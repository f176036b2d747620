//! Rule evaluator.
//!
//! ## Precedence
//!
//! ```text
//! special page -> unconfigured -> enforcement off -> free time
//!   -> allow-list -> platform safe class -> platform restricted class -> block
//! ```
//!
//! First match wins. The evaluator keeps no state between calls apart from a
//! memo of the last compiled allow-list, which is a pure function of the
//! snapshot's pattern strings.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use url::Url;

use super::allow_list::AllowList;
use super::platform::ContentPlatform;
use super::youtube::YouTube;
use super::{AllowReason, BlockReason, Decision};
use crate::budget::{self, FreeTimeStatus};
use crate::policy::{PolicySnapshot, SyncState};

/// Browser-internal URL prefixes that are never blocked.
pub const BROWSER_INTERNAL_SCHEMES: &[&str] = &[
    "chrome:",
    "chrome-extension:",
    "moz-extension:",
    "edge:",
    "brave:",
    "about:",
    "view-source:",
    "devtools:",
];

pub struct RuleEvaluator {
    platforms: Vec<Box<dyn ContentPlatform>>,
    /// Extension pages (including the blocked surface), lowercased.
    internal_pages: Vec<String>,
    compiled: Mutex<Option<Arc<AllowList>>>,
}

impl Default for RuleEvaluator {
    fn default() -> Self {
        Self::new(vec![Box::new(YouTube)])
    }
}

impl std::fmt::Debug for RuleEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEvaluator")
            .field(
                "platforms",
                &self.platforms.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("internal_pages", &self.internal_pages)
            .finish()
    }
}

impl RuleEvaluator {
    /// Platforms are consulted in order; the first one that claims a URL wins.
    pub fn new(platforms: Vec<Box<dyn ContentPlatform>>) -> Self {
        Self {
            platforms,
            internal_pages: Vec::new(),
            compiled: Mutex::new(None),
        }
    }

    /// Treat URLs under these prefixes as the extension's own pages.
    pub fn with_internal_pages<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.internal_pages.extend(
            prefixes
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty()),
        );
        self
    }

    pub fn platform(&self, index: usize) -> Option<&dyn ContentPlatform> {
        self.platforms.get(index).map(|p| p.as_ref())
    }

    /// Browser-internal or extension-owned page.
    pub fn is_special(&self, url: &str) -> bool {
        let lowered = url.trim().to_lowercase();
        BROWSER_INTERNAL_SCHEMES
            .iter()
            .any(|scheme| lowered.starts_with(scheme))
            || self.internal_pages.iter().any(|p| lowered.starts_with(p.as_str()))
    }

    /// Evaluate one navigation target against the cached policy.
    pub fn decide(
        &self,
        url: &str,
        snapshot: Option<&PolicySnapshot>,
        sync: &SyncState,
        now: DateTime<Utc>,
    ) -> Decision {
        if self.is_special(url) {
            return Decision::Allow(AllowReason::SpecialPage);
        }

        let snapshot = match snapshot {
            Some(snapshot) if sync.configured => snapshot,
            _ => return Decision::Block(BlockReason::Unconfigured),
        };

        if !snapshot.enabled {
            return Decision::Allow(AllowReason::EnforcementOff);
        }

        if budget::is_free_time_active(snapshot, sync.last_sync_at, now) {
            return Decision::Allow(AllowReason::FreeTime);
        }

        if self.allow_list(&snapshot.allow_list).matches(url) {
            return Decision::Allow(AllowReason::AllowList);
        }

        if let Ok(parsed) = Url::parse(url.trim()) {
            // Every platform's safe class is tried before any restricted class.
            if self.platforms.iter().any(|p| p.matches_safe_class(&parsed)) {
                return Decision::Allow(AllowReason::SafePlatformPage);
            }
            if let Some(index) = self
                .platforms
                .iter()
                .position(|p| p.matches_restricted_class(&parsed))
            {
                return Decision::NeedsSecondaryCheck { platform: index };
            }
        }

        let reason = match budget::free_time_status(snapshot, sync.last_sync_at, now) {
            FreeTimeStatus::Exhausted => BlockReason::FreeTimeExhausted,
            FreeTimeStatus::NoAllowanceToday => BlockReason::NoAllowanceToday,
            _ => BlockReason::NotAllowed,
        };
        Decision::Block(reason)
    }

    fn allow_list(&self, entries: &[String]) -> Arc<AllowList> {
        let mut memo = self
            .compiled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match memo.as_ref() {
            Some(list) if list.compiled_from(entries) => Arc::clone(list),
            _ => {
                let list = Arc::new(AllowList::compile(entries));
                *memo = Some(Arc::clone(&list));
                list
            }
        }
    }
}

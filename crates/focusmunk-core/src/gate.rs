//! Navigation gate.
//!
//! Two entry points feed the same decision path:
//!
//! - [`NavigationGate::on_navigation`] for each top-level navigation attempt
//! - [`NavigationGate::sweep`] on a timer, across every open surface
//!
//! Both wait for the startup sync, ask the [`RuleEvaluator`], resolve any
//! secondary content check, and redirect blocked surfaces to the blocked page.
//! A verdict is only applied if the surface still shows the URL it was
//! computed for; otherwise it is discarded.
//! Remote failures never escape: a failed content lookup is a block with
//! [`BlockReason::ContentUnverified`].

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::ApiClient;
use crate::error::ConfigError;
use crate::policy::{PolicyCache, SharedCache};
use crate::rules::{BlockReason, Decision, RuleEvaluator};
use crate::sync::BootstrapSignal;

/// Browser-assigned identifier of a tab or window.
pub type SurfaceId = u64;

/// An open navigable surface and the URL it currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Surface {
    pub id: SurfaceId,
    pub url: String,
}

/// The browser, as seen by the gate.
pub trait NavigationHost: Send + Sync {
    /// Surfaces currently open, with their URLs.
    fn open_surfaces(&self) -> Vec<Surface>;

    /// Send `surface` to `target`.
    fn redirect(&self, surface: SurfaceId, target: &str);

    /// URL `surface` shows right now, or `None` if it is not open.
    fn current_url(&self, surface: SurfaceId) -> Option<String> {
        self.open_surfaces()
            .into_iter()
            .find(|s| s.id == surface)
            .map(|s| s.url)
    }

    /// Called before a navigation on `surface` is evaluated.
    fn on_navigated(&self, _surface: &Surface) {}

    /// Called when a surface goes away.
    fn on_closed(&self, _surface: SurfaceId) {}
}

pub struct NavigationGate {
    cache: SharedCache,
    evaluator: Arc<RuleEvaluator>,
    api: ApiClient,
    blocked_page: Url,
    bootstrap: BootstrapSignal,
}

impl std::fmt::Debug for NavigationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationGate")
            .field("blocked_page", &self.blocked_page.as_str())
            .field("bootstrapped", &self.bootstrap.is_ready())
            .finish_non_exhaustive()
    }
}

impl NavigationGate {
    /// # Errors
    /// Returns an error if `blocked_page` is not an absolute URL.
    pub fn new(
        cache: SharedCache,
        evaluator: Arc<RuleEvaluator>,
        api: ApiClient,
        blocked_page: &str,
        bootstrap: BootstrapSignal,
    ) -> Result<Self, ConfigError> {
        let blocked_page = Url::parse(blocked_page).map_err(|e| ConfigError::InvalidValue {
            key: "gate.blocked_page".into(),
            message: e.to_string(),
        })?;
        Ok(Self {
            cache,
            evaluator,
            api,
            blocked_page,
            bootstrap,
        })
    }

    /// Final verdict for `url`: always `Allow` or `Block`.
    pub async fn check(&self, url: &str) -> Decision {
        self.bootstrap.wait().await;
        let cache = self.cache.view();
        let decision = self.evaluator.decide(
            url,
            cache.snapshot.as_deref(),
            &cache.sync,
            Utc::now(),
        );
        match decision {
            Decision::NeedsSecondaryCheck { platform } => {
                self.resolve_content(url, platform, &cache).await
            }
            other => other,
        }
    }

    /// Handle one navigation attempt. Blocked targets are redirected unless
    /// the surface has moved on while the verdict was pending.
    pub async fn on_navigation(
        &self,
        host: &dyn NavigationHost,
        surface: SurfaceId,
        url: &str,
    ) -> Decision {
        host.on_navigated(&Surface {
            id: surface,
            url: url.to_string(),
        });
        let decision = self.check(url).await;
        if let Decision::Block(reason) = decision {
            self.redirect_if_current(host, surface, url, reason);
        }
        decision
    }

    /// Re-evaluate every open surface. Returns how many were redirected.
    pub async fn sweep(&self, host: &dyn NavigationHost) -> usize {
        let mut redirected = 0;
        for surface in host.open_surfaces() {
            if self.evaluator.is_special(&surface.url) {
                continue;
            }
            if let Decision::Block(reason) = self.check(&surface.url).await {
                if self.redirect_if_current(host, surface.id, &surface.url, reason) {
                    redirected += 1;
                }
            }
        }
        if redirected > 0 {
            tracing::info!(redirected, "sweep blocked open surfaces");
        }
        redirected
    }

    /// Redirect on request (companion surfaces asking to be blocked).
    /// A surface already on a special page is left alone.
    pub fn block_surface(
        &self,
        host: &dyn NavigationHost,
        surface: SurfaceId,
        url: &str,
        reason: BlockReason,
    ) -> bool {
        if self.evaluator.is_special(url) {
            tracing::debug!(surface, url, "ignoring block request for special page");
            return false;
        }
        self.redirect(host, surface, url, reason);
        true
    }

    /// `{blocked_page}?url=<original>&reason=<message>`.
    pub fn blocked_url(&self, original: &str, reason: BlockReason) -> String {
        let mut target = self.blocked_page.clone();
        target
            .query_pairs_mut()
            .append_pair("url", original)
            .append_pair("reason", reason.message());
        target.into()
    }

    async fn resolve_content(&self, url: &str, index: usize, cache: &PolicyCache) -> Decision {
        let unverified = Decision::Block(BlockReason::ContentUnverified);
        let (Some(config_id), Some(snapshot)) = (cache.identity.as_deref(), cache.snapshot.as_deref())
        else {
            return unverified;
        };

        let info = match self.api.content_info(url, config_id).await {
            Ok(info) => info,
            Err(err) => {
                tracing::warn!(url, error = %err, "content lookup failed");
                return unverified;
            }
        };

        match self.evaluator.platform(index) {
            Some(platform) => {
                let decision = platform.evaluate_content(&info, snapshot);
                tracing::debug!(url, platform = platform.name(), ?decision, "content evaluated");
                decision
            }
            None => unverified,
        }
    }

    fn redirect_if_current(
        &self,
        host: &dyn NavigationHost,
        surface: SurfaceId,
        url: &str,
        reason: BlockReason,
    ) -> bool {
        if host.current_url(surface).as_deref() != Some(url) {
            tracing::debug!(surface, url, reason = %reason, "surface moved on, discarding verdict");
            return false;
        }
        self.redirect(host, surface, url, reason);
        true
    }

    fn redirect(&self, host: &dyn NavigationHost, surface: SurfaceId, url: &str, reason: BlockReason) {
        let target = self.blocked_url(url, reason);
        tracing::info!(surface, url, reason = %reason, "blocking navigation");
        host.redirect(surface, &target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicySnapshot;
    use std::sync::Mutex;
    use std::time::Duration;

    const BLOCKED_PAGE: &str = "chrome-extension://focusmunk/blocked.html";

    #[derive(Default)]
    struct FakeHost {
        surfaces: Mutex<Vec<Surface>>,
        redirects: Mutex<Vec<(SurfaceId, String)>>,
    }

    impl FakeHost {
        fn with_surfaces(urls: &[&str]) -> Self {
            let surfaces = urls
                .iter()
                .enumerate()
                .map(|(i, url)| Surface {
                    id: i as SurfaceId + 1,
                    url: url.to_string(),
                })
                .collect();
            Self {
                surfaces: Mutex::new(surfaces),
                ..Self::default()
            }
        }

        fn redirects(&self) -> Vec<(SurfaceId, String)> {
            self.redirects.lock().unwrap().clone()
        }
    }

    impl NavigationHost for FakeHost {
        fn open_surfaces(&self) -> Vec<Surface> {
            self.surfaces.lock().unwrap().clone()
        }

        fn redirect(&self, surface: SurfaceId, target: &str) {
            self.redirects
                .lock()
                .unwrap()
                .push((surface, target.to_string()));
            for s in self.surfaces.lock().unwrap().iter_mut() {
                if s.id == surface {
                    s.url = target.to_string();
                }
            }
        }

        fn on_navigated(&self, surface: &Surface) {
            let mut surfaces = self.surfaces.lock().unwrap();
            surfaces.retain(|s| s.id != surface.id);
            surfaces.push(surface.clone());
        }

        fn on_closed(&self, surface: SurfaceId) {
            self.surfaces.lock().unwrap().retain(|s| s.id != surface);
        }
    }

    fn snapshot() -> PolicySnapshot {
        let mut snapshot = PolicySnapshot::new("ABCD-1234");
        snapshot.allow_list = vec![r"^https?://(www\.)?example\.com".into()];
        snapshot.content_keyword_allow_list = vec!["lecture".into()];
        snapshot
    }

    fn gate(api_url: &str, cache: PolicyCache, bootstrap: BootstrapSignal) -> NavigationGate {
        NavigationGate::new(
            SharedCache::new(cache),
            Arc::new(RuleEvaluator::default().with_internal_pages([BLOCKED_PAGE])),
            ApiClient::new(api_url, Duration::from_secs(5)).unwrap(),
            BLOCKED_PAGE,
            bootstrap,
        )
        .unwrap()
    }

    fn synced() -> PolicyCache {
        PolicyCache::synced(snapshot(), Utc::now())
    }

    #[test]
    fn blocked_url_encodes_original_and_reason() {
        let gate = gate("http://localhost:1", synced(), BootstrapSignal::ready());
        let target = gate.blocked_url("https://other.com/a?b=c&d", BlockReason::NotAllowed);
        assert_eq!(
            target,
            "chrome-extension://focusmunk/blocked.html?url=https%3A%2F%2Fother.com%2Fa%3Fb%3Dc%26d&reason=site+is+not+on+the+allow-list"
        );
    }

    #[test]
    fn invalid_blocked_page_is_rejected() {
        let err = NavigationGate::new(
            SharedCache::default(),
            Arc::new(RuleEvaluator::default()),
            ApiClient::new("http://localhost:1", Duration::from_secs(1)).unwrap(),
            "blocked.html",
            BootstrapSignal::ready(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[tokio::test]
    async fn blocked_navigation_is_redirected() {
        let gate = gate("http://localhost:1", synced(), BootstrapSignal::ready());
        let host = FakeHost::default();

        let decision = gate.on_navigation(&host, 7, "https://other.com").await;
        assert_eq!(decision, Decision::Block(BlockReason::NoAllowanceToday));

        let redirects = host.redirects();
        assert_eq!(redirects.len(), 1);
        assert_eq!(redirects[0].0, 7);
        assert!(redirects[0].1.starts_with(BLOCKED_PAGE));
    }

    #[tokio::test]
    async fn allowed_navigation_is_left_alone() {
        let gate = gate("http://localhost:1", synced(), BootstrapSignal::ready());
        let host = FakeHost::default();
        let decision = gate.on_navigation(&host, 1, "https://example.com/page").await;
        assert!(decision.is_allow());
        assert!(host.redirects().is_empty());
    }

    #[tokio::test]
    async fn unconfigured_blocks_everything_but_special_pages() {
        let gate = gate("http://localhost:1", PolicyCache::unconfigured(), BootstrapSignal::ready());
        assert_eq!(
            gate.check("https://example.com").await,
            Decision::Block(BlockReason::Unconfigured)
        );
        assert!(gate.check("chrome://settings").await.is_allow());
    }

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let gate = gate("http://localhost:1", synced(), BootstrapSignal::ready());
        let host = FakeHost::with_surfaces(&[
            "https://example.com/ok",
            "https://other.com",
            "about:blank",
        ]);

        assert_eq!(gate.sweep(&host).await, 1);
        assert_eq!(host.redirects()[0].0, 2);

        // The redirected surface now shows the blocked page.
        assert_eq!(gate.sweep(&host).await, 0);
        assert_eq!(host.redirects().len(), 1);
    }

    #[tokio::test]
    async fn block_request_for_blocked_page_is_ignored() {
        let gate = gate("http://localhost:1", synced(), BootstrapSignal::ready());
        let host = FakeHost::default();
        let already = gate.blocked_url("https://other.com", BlockReason::NotAllowed);
        assert!(!gate.block_surface(&host, 3, &already, BlockReason::NotAllowed));
        assert!(gate.block_surface(&host, 3, "https://other.com", BlockReason::NotAllowed));
        assert_eq!(host.redirects().len(), 1);
    }

    #[tokio::test]
    async fn restricted_content_allowed_by_keyword() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/content-info")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"title": "Algebra Lecture 1", "authorName": "Jane Doe"}"#)
            .create_async()
            .await;

        let gate = gate(&server.url(), synced(), BootstrapSignal::ready());
        let decision = gate.check("https://www.youtube.com/watch?v=abc123").await;
        assert!(decision.is_allow());
    }

    #[tokio::test]
    async fn restricted_content_not_matching_is_blocked() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/content-info")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"title": "Prank compilation", "authorName": "Someone Else"}"#)
            .create_async()
            .await;

        let gate = gate(&server.url(), synced(), BootstrapSignal::ready());
        assert_eq!(
            gate.check("https://www.youtube.com/watch?v=abc123").await,
            Decision::Block(BlockReason::ContentNotAllowed)
        );
    }

    #[tokio::test]
    async fn failed_lookup_blocks_with_reason() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/content-info")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let gate = gate(&server.url(), synced(), BootstrapSignal::ready());
        let host = FakeHost::default();
        let decision = gate
            .on_navigation(&host, 4, "https://youtu.be/abc123")
            .await;
        assert_eq!(decision, Decision::Block(BlockReason::ContentUnverified));
        assert!(host.redirects()[0].1.contains("could+not+verify+content"));
    }

    #[tokio::test]
    async fn surface_closed_during_lookup_is_not_redirected() {
        use std::io::Write;

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/content-info")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_chunked_body(|w| {
                std::thread::sleep(Duration::from_millis(300));
                w.write_all(br#"{"title": "Prank compilation"}"#)
            })
            .create_async()
            .await;

        let gate = Arc::new(gate(&server.url(), synced(), BootstrapSignal::ready()));
        let host = Arc::new(FakeHost::default());
        let pending = tokio::spawn({
            let gate = Arc::clone(&gate);
            let host = Arc::clone(&host);
            async move {
                gate.on_navigation(host.as_ref(), 3, "https://www.youtube.com/watch?v=abc")
                    .await
            }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        host.on_closed(3);

        assert_eq!(
            pending.await.unwrap(),
            Decision::Block(BlockReason::ContentNotAllowed)
        );
        assert!(host.redirects().is_empty());
    }

    #[tokio::test]
    async fn first_navigation_waits_for_bootstrap() {
        let (tx, signal) = BootstrapSignal::channel();
        let gate = Arc::new(gate("http://localhost:1", synced(), signal));

        let pending = tokio::spawn({
            let gate = Arc::clone(&gate);
            async move { gate.check("https://example.com").await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        tx.send_replace(true);
        let decision = tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .unwrap()
            .unwrap();
        assert!(decision.is_allow());
    }
}

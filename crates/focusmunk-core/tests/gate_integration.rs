//! End-to-end tests: background service, sync, evaluator and gate wired
//! together against a mock configuration server.

use std::sync::Arc;

use chrono::{Duration, Utc};
use focusmunk_core::{
    BackgroundService, BlockReason, BridgeHost, Config, Decision, HostCommand, PolicyCache,
    PolicySnapshot, Request, Response, StateStore,
};

fn config_for(server_url: &str) -> Config {
    let mut config = Config::default();
    config.server.url = server_url.to_string();
    config
}

fn service_with(
    server_url: &str,
    cache: PolicyCache,
) -> (
    Arc<BackgroundService>,
    tokio::sync::mpsc::UnboundedReceiver<HostCommand>,
) {
    let store = StateStore::open_memory().unwrap();
    store.save(&cache).unwrap();
    let (host, rx) = BridgeHost::new();
    let service =
        BackgroundService::from_config(&config_for(server_url), store, Arc::new(host)).unwrap();
    (Arc::new(service), rx)
}

async fn navigate(service: &BackgroundService, surface: u64, url: &str) -> Decision {
    match service
        .handle(Request::Navigate {
            surface,
            url: url.into(),
        })
        .await
    {
        Response::Verdict { decision } => decision,
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn test_projected_exhaustion_blocks_while_offline() {
    // Session opened with two minutes left, synced three minutes ago.
    let now = Utc::now();
    let mut snapshot = PolicySnapshot::new("ABCD-1234");
    snapshot.daily_budget_seconds = focusmunk_core::DailyBudget::uniform(1800);
    snapshot.free_time_session_started_at = Some(now - Duration::seconds(300));
    snapshot.free_time_remaining_seconds = 120;
    let cache = PolicyCache::synced(snapshot, now - Duration::seconds(180));

    let (service, mut rx) = service_with("http://127.0.0.1:1", cache);
    service.sync().bootstrap().await;

    let decision = navigate(&service, 1, "https://other.com").await;
    assert_eq!(decision, Decision::Block(BlockReason::FreeTimeExhausted));
    let HostCommand::Redirect { surface, target } = rx.try_recv().unwrap();
    assert_eq!(surface, 1);
    assert!(target.contains("url=https%3A%2F%2Fother.com"));
}

#[tokio::test]
async fn test_temporary_disable_allows_everything() {
    let mut server = mockito::Server::new_async().await;
    let until = (Utc::now() + Duration::hours(1)).to_rfc3339();
    server
        .mock("GET", "/config/ABCD-1234")
        .with_status(200)
        .with_body(format!(r#"{{"id": "ABCD-1234", "disabledUntil": "{until}"}}"#))
        .create_async()
        .await;

    let (service, mut rx) = service_with(&server.url(), PolicyCache::paired("ABCD-1234"));
    service.sync().bootstrap().await;

    assert!(navigate(&service, 1, "https://other.com").await.is_allow());
    assert!(rx.try_recv().is_err());

    match service.handle(Request::GetState).await {
        Response::State(report) => assert!(report.override_active),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn test_deletion_then_navigation_is_fail_closed() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/config/ABCD-1234")
        .with_status(404)
        .create_async()
        .await;

    let mut snapshot = PolicySnapshot::new("ABCD-1234");
    snapshot.enabled = false;
    let (service, mut rx) = service_with(&server.url(), PolicyCache::synced(snapshot, Utc::now()));
    service.sync().bootstrap().await;

    assert_eq!(
        navigate(&service, 2, "https://example.com").await,
        Decision::Block(BlockReason::Unconfigured)
    );
    assert!(rx.try_recv().is_ok());
}

#[tokio::test]
async fn test_video_from_allowed_creator_loads() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/config/ABCD-1234")
        .with_status(200)
        .with_body(r#"{"id": "ABCD-1234", "youtubeCreators": ["https://www.youtube.com/@MathChannel"]}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/content-info")
        .match_query(mockito::Matcher::UrlEncoded(
            "configId".into(),
            "ABCD-1234".into(),
        ))
        .with_status(200)
        .with_body(r#"{"title": "Week 3", "authorName": "Math Channel", "authorUrl": "https://www.youtube.com/@mathchannel"}"#)
        .create_async()
        .await;

    let (service, mut rx) = service_with(&server.url(), PolicyCache::paired("ABCD-1234"));
    service.sync().bootstrap().await;

    let decision = navigate(&service, 3, "https://www.youtube.com/watch?v=xyz").await;
    assert!(decision.is_allow(), "got {decision:?}");
    assert!(rx.try_recv().is_err());

    // Channel pages are browsable without a lookup.
    assert!(navigate(&service, 3, "https://www.youtube.com/results?search_query=math")
        .await
        .is_allow());
}

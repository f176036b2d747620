//! Messages exchanged between the background service and its companion
//! surfaces (popup, settings page, blocked page, the browser bridge).
//!
//! Every message is a JSON object tagged by `"type"`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::budget::{self, FreeTimeStatus};
use crate::gate::SurfaceId;
use crate::policy::{PolicyCache, PolicySnapshot};
use crate::rules::{BlockReason, Decision};
use crate::sync::SyncOutcome;

/// Inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    GetState,
    RefreshConfig,
    BlockPage {
        surface: SurfaceId,
        url: String,
        #[serde(default)]
        reason: Option<BlockReason>,
    },
    /// Host notification: a surface started a top-level navigation.
    Navigate { surface: SurfaceId, url: String },
    /// Host notification: a surface was closed.
    Closed { surface: SurfaceId },
}

/// Reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    State(StateReport),
    Refreshed(SyncOutcome),
    Verdict { decision: Decision },
    Ok,
    Error { message: String },
}

/// Command from the service to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostCommand {
    Redirect { surface: SurfaceId, target: String },
}

/// What `getState` reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateReport {
    pub configured: bool,
    pub config_id: Option<String>,
    pub snapshot: Option<PolicySnapshot>,
    pub projected_remaining_seconds: i64,
    /// Free time or a temporary disable is suspending enforcement.
    pub override_active: bool,
    pub free_time: Option<FreeTimeStatus>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Set when the last pairing ended because the server deleted it.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl StateReport {
    pub fn from_cache(cache: &PolicyCache, now: DateTime<Utc>) -> Self {
        let snapshot = cache.snapshot.as_deref().filter(|_| cache.is_configured());
        let last_sync_at = cache.sync.last_sync_at;
        Self {
            configured: cache.is_configured(),
            config_id: cache.identity.clone(),
            snapshot: snapshot.cloned(),
            projected_remaining_seconds: snapshot
                .map(|s| budget::projected_remaining_seconds(s, last_sync_at, now))
                .unwrap_or(0),
            override_active: snapshot
                .is_some_and(|s| budget::is_free_time_active(s, last_sync_at, now)),
            free_time: snapshot.map(|s| budget::free_time_status(s, last_sync_at, now)),
            last_sync_at,
            last_error: cache.sync.last_error.clone(),
            deleted_at: cache.sync.deleted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::AllowReason;
    use serde_json::json;

    #[test]
    fn requests_use_camel_case_tags() {
        let req: Request = serde_json::from_value(json!({"type": "getState"})).unwrap();
        assert_eq!(req, Request::GetState);

        let req: Request = serde_json::from_value(json!({
            "type": "blockPage",
            "surface": 12,
            "url": "https://other.com"
        }))
        .unwrap();
        assert_eq!(
            req,
            Request::BlockPage {
                surface: 12,
                url: "https://other.com".into(),
                reason: None,
            }
        );
    }

    #[test]
    fn refreshed_response_is_flat() {
        let value = serde_json::to_value(Response::Refreshed(SyncOutcome::Stale {
            reason: "timeout".into(),
        }))
        .unwrap();
        assert_eq!(
            value,
            json!({"type": "refreshed", "outcome": "stale", "reason": "timeout"})
        );
    }

    #[test]
    fn verdict_response_carries_reason() {
        let value = serde_json::to_value(Response::Verdict {
            decision: Decision::Allow(AllowReason::AllowList),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({"type": "verdict", "decision": {"verdict": "allow", "reason": "allowList"}})
        );
    }

    #[test]
    fn host_command_encoding() {
        let value = serde_json::to_value(HostCommand::Redirect {
            surface: 3,
            target: "chrome-extension://focusmunk/blocked.html".into(),
        })
        .unwrap();
        assert_eq!(value["type"], "redirect");
        assert_eq!(value["surface"], 3);
    }

    #[test]
    fn state_report_for_unconfigured_cache() {
        let report = StateReport::from_cache(&PolicyCache::unconfigured(), Utc::now());
        assert!(!report.configured);
        assert!(report.snapshot.is_none());
        assert!(!report.override_active);
        assert_eq!(report.projected_remaining_seconds, 0);
    }

    #[test]
    fn state_report_distinguishes_deleted_from_never_paired() {
        let at = Utc::now();
        let never = serde_json::to_value(StateReport::from_cache(&PolicyCache::unconfigured(), at))
            .unwrap();
        assert_eq!(never["deletedAt"], serde_json::Value::Null);

        let report = StateReport::from_cache(&PolicyCache::deleted(at), at);
        assert!(!report.configured);
        assert!(report.config_id.is_none());
        assert_eq!(report.deleted_at, Some(at));
        let value = serde_json::to_value(&report).unwrap();
        assert!(value["deletedAt"].is_string());
    }

    #[test]
    fn state_report_projects_open_session() {
        let now = Utc::now();
        let mut snapshot = PolicySnapshot::new("ABCD-1234");
        snapshot.free_time_session_started_at = Some(now - chrono::Duration::seconds(200));
        snapshot.free_time_remaining_seconds = 600;
        let cache = PolicyCache::synced(snapshot, now - chrono::Duration::seconds(100));

        let report = StateReport::from_cache(&cache, now);
        assert!(report.configured);
        assert!(report.override_active);
        assert_eq!(report.projected_remaining_seconds, 500);
        assert_eq!(report.free_time, Some(FreeTimeStatus::Active { remaining: 500 }));
    }
}

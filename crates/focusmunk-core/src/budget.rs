//! Budget tracker.
//!
//! Projects the server's free-time counter forward from the last sync using
//! wall-clock deltas, the same way the timer engine flushes elapsed time
//! between ticks. Everything here is a pure function of
//! `(snapshot, last_sync_at, now)`; nothing is written back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::PolicySnapshot;

/// Free-time seconds left at `now`.
///
/// With no session open the stored value is returned as-is: the budget only
/// drains while a session is open. With a session open, the time elapsed since
/// `last_sync_at` is subtracted and the result floored at zero. A clock that
/// moved backwards counts as zero elapsed time.
pub fn projected_remaining_seconds(
    snapshot: &PolicySnapshot,
    last_sync_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> i64 {
    let stored = snapshot.free_time_remaining_seconds.max(0);
    if !snapshot.session_open() {
        return stored;
    }
    let Some(synced_at) = last_sync_at else {
        return stored;
    };
    let elapsed = (now - synced_at).num_seconds().max(0);
    stored.saturating_sub(elapsed).max(0)
}

/// Whether a temporary disable is in force at `now`.
pub fn is_temporarily_disabled(snapshot: &PolicySnapshot, now: DateTime<Utc>) -> bool {
    snapshot
        .temporary_disable_until
        .is_some_and(|until| now < until)
}

/// True while blocking is suspended: either a temporary disable is in force,
/// or a session is open with budget left. An open session whose projected
/// budget hit zero is *not* free time.
pub fn is_free_time_active(
    snapshot: &PolicySnapshot,
    last_sync_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    if is_temporarily_disabled(snapshot, now) {
        return true;
    }
    snapshot.session_open() && projected_remaining_seconds(snapshot, last_sync_at, now) > 0
}

/// User-facing classification of the budget.
///
/// `Exhausted` and `NoAllowanceToday` both block; they are kept apart so the
/// blocked surface and the status output can say which one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FreeTimeStatus {
    TemporarilyDisabled { until: DateTime<Utc> },
    Active { remaining: i64 },
    Exhausted,
    NoAllowanceToday,
    Available { remaining: i64 },
    UsedUp,
}

impl FreeTimeStatus {
    /// Whether this status suspends blocking.
    pub fn suspends_blocking(self) -> bool {
        matches!(self, Self::TemporarilyDisabled { .. } | Self::Active { .. })
    }
}

pub fn free_time_status(
    snapshot: &PolicySnapshot,
    last_sync_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> FreeTimeStatus {
    if let Some(until) = snapshot.temporary_disable_until.filter(|until| now < *until) {
        return FreeTimeStatus::TemporarilyDisabled { until };
    }

    let remaining = projected_remaining_seconds(snapshot, last_sync_at, now);
    if snapshot.allowance_on(now) <= 0 && remaining <= 0 {
        return FreeTimeStatus::NoAllowanceToday;
    }

    match (snapshot.session_open(), remaining > 0) {
        (true, true) => FreeTimeStatus::Active { remaining },
        (true, false) => FreeTimeStatus::Exhausted,
        (false, true) => FreeTimeStatus::Available { remaining },
        (false, false) => FreeTimeStatus::UsedUp,
    }
}

/// `1h 05m`, `4m 09s`, `12s`.
pub fn format_seconds(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{h}h {m:02}m")
    } else if m > 0 {
        format!("{m}m {s:02}s")
    } else {
        format!("{s}s")
    }
}

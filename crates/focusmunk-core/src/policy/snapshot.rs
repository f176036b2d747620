//! Server-issued policy snapshot.
//!
//! Field names follow the server's camelCase wire format; the Rust names
//! describe what each field means to the decision engine.

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Allotted free-time seconds per weekday. The week starts on Monday.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBudget {
    #[serde(default)]
    pub mon: i64,
    #[serde(default)]
    pub tue: i64,
    #[serde(default)]
    pub wed: i64,
    #[serde(default)]
    pub thu: i64,
    #[serde(default)]
    pub fri: i64,
    #[serde(default)]
    pub sat: i64,
    #[serde(default)]
    pub sun: i64,
}

impl DailyBudget {
    /// Same allowance every day of the week.
    pub fn uniform(seconds: i64) -> Self {
        Self {
            mon: seconds,
            tue: seconds,
            wed: seconds,
            thu: seconds,
            fri: seconds,
            sat: seconds,
            sun: seconds,
        }
    }

    pub fn for_weekday(&self, day: Weekday) -> i64 {
        match day {
            Weekday::Mon => self.mon,
            Weekday::Tue => self.tue,
            Weekday::Wed => self.wed,
            Weekday::Thu => self.thu,
            Weekday::Fri => self.fri,
            Weekday::Sat => self.sat,
            Weekday::Sun => self.sun,
        }
    }
}

/// Last known server policy.
///
/// `free_time_remaining_seconds` is only authoritative at the instant of the
/// sync that produced this value. Use [`crate::budget`] to project it forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySnapshot {
    /// Opaque configuration identifier, e.g. `ABCD-1234`.
    pub id: String,
    /// Master switch. Servers that don't send it are treated as enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, rename = "whitelist")]
    pub allow_list: Vec<String>,
    #[serde(default, rename = "dailyFreeSeconds")]
    pub daily_budget_seconds: DailyBudget,
    /// Present while a free-time session is open.
    #[serde(default, rename = "freeTimeStartedAt")]
    pub free_time_session_started_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "freeTimeRemaining")]
    pub free_time_remaining_seconds: i64,
    #[serde(default, rename = "disabledUntil")]
    pub temporary_disable_until: Option<DateTime<Utc>>,
    #[serde(default, rename = "youtubeCreators")]
    pub content_creator_allow_list: Vec<String>,
    #[serde(default, rename = "youtubeKeywords")]
    pub content_keyword_allow_list: Vec<String>,
    /// Informational; the server's running total for today.
    #[serde(default)]
    pub free_time_used_today: i64,
    /// Informational; today's allowance as the server computed it.
    #[serde(default)]
    pub todays_allowance: i64,
}

fn default_true() -> bool {
    true
}

impl PolicySnapshot {
    /// An enabled snapshot with no allowances. Mostly useful as a base for
    /// tests and for callers that build a snapshot field by field.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            allow_list: Vec::new(),
            daily_budget_seconds: DailyBudget::default(),
            free_time_session_started_at: None,
            free_time_remaining_seconds: 0,
            temporary_disable_until: None,
            content_creator_allow_list: Vec::new(),
            content_keyword_allow_list: Vec::new(),
            free_time_used_today: 0,
            todays_allowance: 0,
        }
    }

    pub fn session_open(&self) -> bool {
        self.free_time_session_started_at.is_some()
    }

    /// Allowance for the weekday of `at`, in seconds.
    pub fn allowance_on(&self, at: DateTime<Utc>) -> i64 {
        use chrono::Datelike;
        self.daily_budget_seconds.for_weekday(at.weekday())
    }
}

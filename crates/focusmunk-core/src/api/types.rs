//! Request and response bodies for the configuration server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::DailyBudget;

/// Body of `POST /config`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConfigRequest {
    pub setup_code: String,
    pub password: String,
    pub whitelist: Vec<String>,
    pub youtube_keywords: Vec<String>,
    pub youtube_creators: Vec<String>,
    /// Minutes, not seconds: the server converts on write.
    pub daily_free_minutes: DailyBudget,
}

/// Fields of `PUT /config/{id}`. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_keywords: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_creators: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_free_minutes: Option<DailyBudget>,
}

impl PolicyUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct WithPassword<'a, T: Serialize> {
    pub password: &'a str,
    #[serde(flatten)]
    pub body: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChangePassword<'a> {
    pub password: &'a str,
    pub new_password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct DisableRequest<'a> {
    pub password: &'a str,
    pub hours: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SetupCode<'a> {
    pub setup_code: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct Password<'a> {
    pub password: &'a str,
}

/// Response of the start/end free-time calls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeTimeResponse {
    #[serde(default)]
    pub free_time_remaining: i64,
    #[serde(default)]
    pub todays_allowance: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DisableResponse {
    pub disabled_until: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Created {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Valid {
    #[serde(default)]
    pub valid: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Health {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

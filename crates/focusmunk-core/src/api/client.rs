//! ApiClient: typed calls against the configuration server.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use super::types::{
    ChangePassword, Created, CreateConfigRequest, DisableRequest, DisableResponse, ErrorBody,
    FreeTimeResponse, Health, Password, PolicyUpdate, SetupCode, Valid, WithPassword,
};
use crate::error::ApiError;
use crate::policy::PolicySnapshot;
use crate::rules::ContentInfo;

/// Client for the configuration server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    http_client: Client,
}

impl ApiClient {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base = Url::parse(base_url)
            .map_err(|e| ApiError::Decode(format!("invalid server URL '{base_url}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::Decode(format!("invalid server URL '{base_url}'")));
        }
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base, http_client })
    }

    /// `GET /config/{id}`. A 404 comes back as [`ApiError::NotFound`].
    pub async fn fetch_config(&self, config_id: &str) -> Result<PolicySnapshot, ApiError> {
        let url = self.endpoint(&["config", config_id]);
        let resp = self.http_client.get(url).send().await?;
        decode(resp).await
    }

    /// `POST /config`. Returns the id of the new configuration.
    pub async fn create_config(&self, request: &CreateConfigRequest) -> Result<String, ApiError> {
        let url = self.endpoint(&["config"]);
        let resp = self.http_client.post(url).json(request).send().await?;
        let created: Created = decode(resp).await?;
        Ok(created.id)
    }

    /// `PUT /config/{id}`. Returns the server's view of the updated policy.
    pub async fn update_config(
        &self,
        config_id: &str,
        password: &str,
        update: &PolicyUpdate,
    ) -> Result<PolicySnapshot, ApiError> {
        let url = self.endpoint(&["config", config_id]);
        let body = WithPassword {
            password,
            body: update,
        };
        let resp = self.http_client.put(url).json(&body).send().await?;
        decode(resp).await
    }

    /// `POST /config/{id}/verify`.
    pub async fn verify_password(&self, config_id: &str, password: &str) -> Result<bool, ApiError> {
        let url = self.endpoint(&["config", config_id, "verify"]);
        let resp = self
            .http_client
            .post(url)
            .json(&Password { password })
            .send()
            .await?;
        let valid: Valid = decode(resp).await?;
        Ok(valid.valid)
    }

    /// `POST /config/{id}/change-password`.
    pub async fn change_password(
        &self,
        config_id: &str,
        password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["config", config_id, "change-password"]);
        let body = ChangePassword {
            password,
            new_password,
        };
        let resp = self.http_client.post(url).json(&body).send().await?;
        decode::<serde_json::Value>(resp).await.map(|_| ())
    }

    /// `POST /config/{id}/start-free-time`.
    pub async fn start_free_time(&self, config_id: &str) -> Result<FreeTimeResponse, ApiError> {
        self.post_empty(&["config", config_id, "start-free-time"]).await
    }

    /// `POST /config/{id}/end-free-time`.
    pub async fn end_free_time(&self, config_id: &str) -> Result<FreeTimeResponse, ApiError> {
        self.post_empty(&["config", config_id, "end-free-time"]).await
    }

    /// `POST /config/{id}/temporary-disable`. Returns the new disable deadline.
    pub async fn temporary_disable(
        &self,
        config_id: &str,
        password: &str,
        hours: f64,
    ) -> Result<DateTime<Utc>, ApiError> {
        let url = self.endpoint(&["config", config_id, "temporary-disable"]);
        let resp = self
            .http_client
            .post(url)
            .json(&DisableRequest { password, hours })
            .send()
            .await?;
        let disabled: DisableResponse = decode(resp).await?;
        Ok(disabled.disabled_until)
    }

    /// `POST /config/{id}/cancel-disable`.
    pub async fn cancel_disable(&self, config_id: &str) -> Result<(), ApiError> {
        self.post_empty::<serde_json::Value>(&["config", config_id, "cancel-disable"])
            .await
            .map(|_| ())
    }

    /// `GET /content-info?url=&configId=`.
    pub async fn content_info(&self, url: &str, config_id: &str) -> Result<ContentInfo, ApiError> {
        let endpoint = self.endpoint(&["content-info"]);
        let resp = self
            .http_client
            .get(endpoint)
            .query(&[("url", url), ("configId", config_id)])
            .send()
            .await?;
        decode(resp).await
    }

    /// `POST /setup-code/verify`.
    pub async fn verify_setup_code(&self, setup_code: &str) -> Result<bool, ApiError> {
        let url = self.endpoint(&["setup-code", "verify"]);
        let resp = self
            .http_client
            .post(url)
            .json(&SetupCode { setup_code })
            .send()
            .await?;
        let valid: Valid = decode(resp).await?;
        Ok(valid.valid)
    }

    /// `GET /health`. `false` when the server answers but is not ready.
    pub async fn health(&self) -> Result<bool, ApiError> {
        let resp = self.http_client.get(self.endpoint(&["health"])).send().await?;
        let health: Health = decode(resp).await?;
        Ok(health.status == "ok")
    }

    async fn post_empty<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let resp = self
            .http_client
            .post(self.endpoint(segments))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        decode(resp).await
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Map the status to an [`ApiError`] or decode the JSON body.
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return resp.json::<T>().await.map_err(|e| ApiError::Decode(e.to_string()));
    }

    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);

    Err(match status {
        StatusCode::NOT_FOUND => ApiError::NotFound,
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
        _ => ApiError::Status {
            status: status.as_u16(),
            message,
        },
    })
}

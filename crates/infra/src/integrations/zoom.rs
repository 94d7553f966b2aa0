//! Zoom provider implementation
//!
//! OAuth client credentials ride the standard token endpoint with basic
//! auth; the data surface schedules meetings for the authed user.

use async_trait::async_trait;
use beacon_core::{MeetingScheduler, ProviderClient};
use beacon_domain::{
    CredentialRecord, Meeting, MeetingRequest, Provider, Result, ZoomConfig,
};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::integrations::{map_parse_error, map_request_error, map_status_error, TokenSlot};

const ZOOM_API_BASE: &str = "https://api.zoom.us";
const ZOOM_TOKEN_URL: &str = "https://zoom.us/oauth/token";

/// Scheduled-meeting type in Zoom's API.
const MEETING_TYPE_SCHEDULED: u8 = 2;

/// Zoom REST client.
pub struct ZoomClient {
    http: Client,
    config: ZoomConfig,
    tokens: TokenSlot,
    api_base: String,
    token_url: String,
}

impl ZoomClient {
    /// Create a client for the production API.
    ///
    /// # Errors
    /// Returns `BeaconError::Config` when the config fails validation.
    pub fn new(config: ZoomConfig) -> Result<Self> {
        Self::with_endpoints(config, ZOOM_API_BASE, ZOOM_TOKEN_URL)
    }

    /// Create a client against custom endpoints (tests).
    ///
    /// # Errors
    /// Returns `BeaconError::Config` when the config fails validation.
    pub fn with_endpoints(
        config: ZoomConfig,
        api_base: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            http: Client::new(),
            config,
            tokens: TokenSlot::new(Provider::Zoom),
            api_base: api_base.into(),
            token_url: token_url.into(),
        })
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<CredentialRecord> {
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(params)
            .send()
            .await
            .map_err(|e| map_request_error(e, "zoom oauth"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, "zoom oauth", &body));
        }

        let tokens: ZoomTokenResponse =
            response.json().await.map_err(|e| map_parse_error(e, "zoom oauth"))?;

        Ok(CredentialRecord::new(
            Provider::Zoom,
            tokens.access_token,
            tokens.refresh_token,
            tokens.expires_in,
        ))
    }
}

#[async_trait]
impl ProviderClient for ZoomClient {
    fn provider(&self) -> Provider {
        Provider::Zoom
    }

    fn set_tokens(&self, record: CredentialRecord) {
        self.tokens.set(record);
    }

    async fn exchange_code(&self, code: &str) -> Result<CredentialRecord> {
        self.token_request(&[("grant_type", "authorization_code"), ("code", code)]).await
    }

    async fn refresh_tokens(&self, refresh_token: &str) -> Result<Option<CredentialRecord>> {
        let record = self
            .token_request(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .await?;
        Ok(Some(record))
    }
}

#[async_trait]
impl MeetingScheduler for ZoomClient {
    async fn create_meeting(&self, request: MeetingRequest) -> Result<Meeting> {
        let token = self.tokens.access_token()?;
        let url = format!("{}/v2/users/me/meetings", self.api_base);

        let mut body = serde_json::json!({
            "topic": request.topic,
            "type": MEETING_TYPE_SCHEDULED,
        });
        if let Some(start_time) = request.start_time {
            body["start_time"] = serde_json::Value::String(start_time.to_rfc3339());
        }
        if let Some(duration) = request.duration_minutes {
            body["duration"] = serde_json::json!(duration);
        }

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_request_error(e, "zoom meeting"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, "zoom meeting", &body));
        }

        let created: ZoomMeetingResponse =
            response.json().await.map_err(|e| map_parse_error(e, "zoom meeting"))?;

        info!(meeting_id = created.id, "zoom meeting created");
        Ok(Meeting {
            id: created.id.to_string(),
            join_url: created.join_url,
            start_url: created.start_url,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ZoomTokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ZoomMeetingResponse {
    id: u64,
    join_url: String,
    #[serde(default)]
    start_url: Option<String>,
}

//! Gmail provider implementation
//!
//! Lists recent inbox messages, then fetches From/Subject metadata for each
//! one. Unread and starred state come from the message's label ids.

use std::sync::Arc;

use async_trait::async_trait;
use beacon_core::{MailSource, ProviderClient};
use beacon_domain::{CredentialRecord, EmailMessage, Provider, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use super::oauth::GoogleOAuth;
use crate::integrations::{map_parse_error, map_request_error, map_status_error, TokenSlot};

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";
const MAX_RESULTS: u32 = 15;

/// Gmail client over the v1 users API.
pub struct GmailClient {
    http: Client,
    oauth: Arc<GoogleOAuth>,
    tokens: TokenSlot,
    base_url: String,
}

impl GmailClient {
    /// Create a client for the production API.
    pub fn new(oauth: Arc<GoogleOAuth>) -> Self {
        Self::with_base_url(oauth, GMAIL_API_BASE)
    }

    /// Create a client against a custom API base (tests).
    pub fn with_base_url(oauth: Arc<GoogleOAuth>, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            oauth,
            tokens: TokenSlot::new(Provider::Google),
            base_url: base_url.into(),
        }
    }

    async fn fetch_metadata(&self, token: &str, id: &str) -> Result<EmailMessage> {
        let url = format!("{}/users/me/messages/{id}", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("format", "metadata"),
                ("metadataHeaders", "From"),
                ("metadataHeaders", "Subject"),
            ])
            .send()
            .await
            .map_err(|e| map_request_error(e, "gmail message"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, "gmail message", &body));
        }

        let detail: GmailMessageDetail =
            response.json().await.map_err(|e| map_parse_error(e, "gmail message"))?;

        Ok(detail.into_email())
    }
}

#[async_trait]
impl ProviderClient for GmailClient {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn set_tokens(&self, record: CredentialRecord) {
        self.tokens.set(record);
    }

    async fn exchange_code(&self, code: &str) -> Result<CredentialRecord> {
        self.oauth.exchange_code(code).await
    }

    async fn refresh_tokens(&self, refresh_token: &str) -> Result<Option<CredentialRecord>> {
        self.oauth.refresh(refresh_token).await
    }
}

#[async_trait]
impl MailSource for GmailClient {
    async fn recent_messages(&self) -> Result<Vec<EmailMessage>> {
        let token = self.tokens.access_token()?;
        let url = format!("{}/users/me/messages", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .query(&[
                ("maxResults", MAX_RESULTS.to_string()),
                ("labelIds", "INBOX".to_string()),
            ])
            .send()
            .await
            .map_err(|e| map_request_error(e, "gmail list"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, "gmail list", &body));
        }

        let listing: GmailListResponse =
            response.json().await.map_err(|e| map_parse_error(e, "gmail list"))?;

        let mut emails = Vec::new();
        for reference in listing.messages {
            match self.fetch_metadata(&token, &reference.id).await {
                Ok(email) => emails.push(email),
                // Auth failures must bubble up so the coordinator can
                // refresh; a single bad message is just skipped.
                Err(err) if err.is_auth() => return Err(err),
                Err(err) => {
                    warn!(message_id = %reference.id, error = %err, "skipping unreadable gmail message");
                }
            }
        }

        Ok(emails)
    }
}

#[derive(Debug, Deserialize)]
struct GmailListResponse {
    #[serde(default)]
    messages: Vec<GmailMessageRef>,
}

#[derive(Debug, Deserialize)]
struct GmailMessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GmailMessageDetail {
    id: String,
    #[serde(rename = "labelIds", default)]
    label_ids: Vec<String>,
    #[serde(rename = "internalDate", default)]
    internal_date: Option<String>,
    #[serde(default)]
    payload: GmailPayload,
}

#[derive(Debug, Default, Deserialize)]
struct GmailPayload {
    #[serde(default)]
    headers: Vec<GmailHeader>,
}

#[derive(Debug, Deserialize)]
struct GmailHeader {
    name: String,
    value: String,
}

impl GmailMessageDetail {
    fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    fn into_email(self) -> EmailMessage {
        let subject = self.header("Subject").unwrap_or("(no subject)").to_string();
        let from = self.header("From").unwrap_or_default().to_string();
        let received_at = self
            .internal_date
            .as_deref()
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(DateTime::<Utc>::from_timestamp_millis);

        EmailMessage {
            is_unread: self.label_ids.iter().any(|l| l == "UNREAD"),
            is_starred: self.label_ids.iter().any(|l| l == "STARRED"),
            id: self.id,
            subject,
            from,
            received_at,
        }
    }
}

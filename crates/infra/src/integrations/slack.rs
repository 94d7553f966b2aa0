//! Slack provider implementation
//!
//! One client covers both surfaces this core needs from Slack: the read
//! side feeding the suggestion engine (mentions, DMs, saved messages) and
//! the feedback side used by the inbound poller (threaded replies and
//! reaction swaps).
//!
//! Slack reports failures inside a 200 response (`ok: false` plus an error
//! code), so the auth taxonomy is driven by the error code rather than the
//! HTTP status.

use std::collections::HashSet;

use async_trait::async_trait;
use beacon_core::{ChatNotifier, ChatSource, ProviderClient};
use beacon_domain::{
    BeaconError, ChatMessage, ChatMessageKind, CredentialRecord, Provider, Result, SlackConfig,
};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::integrations::{map_parse_error, map_request_error, map_status_error, TokenSlot};

const SLACK_API_BASE: &str = "https://slack.com/api";
const SEARCH_COUNT: u32 = 20;

/// Error codes Slack uses for dead or missing credentials.
const AUTH_ERROR_CODES: [&str; 5] =
    ["invalid_auth", "not_authed", "token_revoked", "token_expired", "account_inactive"];

/// Slack Web API client.
pub struct SlackClient {
    http: Client,
    config: SlackConfig,
    tokens: TokenSlot,
    base_url: String,
}

impl SlackClient {
    /// Create a client for the production API.
    ///
    /// # Errors
    /// Returns `BeaconError::Config` when the config fails validation.
    pub fn new(config: SlackConfig) -> Result<Self> {
        Self::with_base_url(config, SLACK_API_BASE)
    }

    /// Create a client against a custom API base (tests).
    ///
    /// # Errors
    /// Returns `BeaconError::Config` when the config fails validation.
    pub fn with_base_url(config: SlackConfig, base_url: impl Into<String>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            http: Client::new(),
            config,
            tokens: TokenSlot::new(Provider::Slack),
            base_url: base_url.into(),
        })
    }

    async fn oauth_access(&self, params: &[(&str, &str)]) -> Result<CredentialRecord> {
        let url = format!("{}/oauth.v2.access", self.base_url);
        let response = self
            .http
            .post(&url)
            .form(params)
            .send()
            .await
            .map_err(|e| map_request_error(e, "slack oauth"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, "slack oauth", &body));
        }

        let payload: OAuthAccessResponse =
            response.json().await.map_err(|e| map_parse_error(e, "slack oauth"))?;
        ensure_ok(payload.ok, payload.error, "slack oauth")?;

        // The user token (authed_user) is what the read surface needs;
        // bot-only installs fall back to the top-level token.
        let (access_token, refresh_token, expires_in) = match payload.authed_user {
            Some(user) if user.access_token.is_some() => {
                (user.access_token, user.refresh_token, user.expires_in)
            }
            _ => (payload.access_token, payload.refresh_token, payload.expires_in),
        };

        let access_token = access_token.ok_or_else(|| {
            BeaconError::InvalidInput("slack oauth response carried no access token".to_string())
        })?;

        Ok(CredentialRecord::new(Provider::Slack, access_token, refresh_token, expires_in))
    }

    async fn fetch_search_matches(&self, token: &str) -> Result<Vec<ChatMessage>> {
        let url = format!("{}/search.messages", self.base_url);
        let query = format!("<@{}>", self.config.user_id);
        let count = SEARCH_COUNT.to_string();

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("query", query.as_str()),
                ("count", count.as_str()),
                ("sort", "timestamp"),
            ])
            .send()
            .await
            .map_err(|e| map_request_error(e, "slack search"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, "slack search", &body));
        }

        let payload: SearchResponse =
            response.json().await.map_err(|e| map_parse_error(e, "slack search"))?;
        ensure_ok(payload.ok, payload.error, "slack search")?;

        let matches = payload.messages.map(|m| m.matches).unwrap_or_default();
        Ok(matches
            .into_iter()
            .map(|m| {
                // DM channel ids start with 'D'; everything else that
                // matched the user's handle is a mention.
                let kind = if m.channel.id.starts_with('D') {
                    ChatMessageKind::Dm
                } else {
                    ChatMessageKind::Mention
                };
                ChatMessage {
                    id: format!("{}-{}", m.channel.id, m.ts),
                    kind,
                    text: m.text,
                    user: m.user.unwrap_or_default(),
                    channel: m.channel.id,
                    timestamp: m.ts,
                }
            })
            .collect())
    }

    /// Saved-for-later messages are a best-effort enrichment: a failure is
    /// logged and the mention results stand on their own.
    async fn fetch_saved_messages(&self, token: &str) -> Result<Vec<ChatMessage>> {
        let url = format!("{}/stars.list", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| map_request_error(e, "slack saved items"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, "slack saved items", &body));
        }

        let payload: StarsResponse =
            response.json().await.map_err(|e| map_parse_error(e, "slack saved items"))?;
        ensure_ok(payload.ok, payload.error, "slack saved items")?;

        Ok(payload
            .items
            .into_iter()
            .filter(|item| item.item_type == "message")
            .filter_map(|item| item.message)
            .map(|m| ChatMessage {
                id: format!("{}-{}", m.channel, m.ts),
                kind: ChatMessageKind::Saved,
                text: m.text,
                user: m.user.unwrap_or_default(),
                channel: m.channel,
                timestamp: m.ts,
            })
            .collect())
    }

    async fn reaction_call(
        &self,
        endpoint: &str,
        channel: &str,
        timestamp: &str,
        name: &str,
        tolerated: &str,
    ) -> Result<()> {
        let token = self.tokens.access_token()?;
        let url = format!("{}/{endpoint}", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({
                "channel": channel,
                "timestamp": timestamp,
                "name": name,
            }))
            .send()
            .await
            .map_err(|e| map_request_error(e, endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, endpoint, &body));
        }

        let payload: Envelope =
            response.json().await.map_err(|e| map_parse_error(e, endpoint))?;

        // Re-adding or re-removing a reaction is not a failure worth
        // surfacing; the end state is what was asked for.
        if let Some(code) = &payload.error {
            if code == tolerated {
                debug!(endpoint, code, "reaction already in requested state");
                return Ok(());
            }
        }
        ensure_ok(payload.ok, payload.error, endpoint)
    }
}

#[async_trait]
impl ProviderClient for SlackClient {
    fn provider(&self) -> Provider {
        Provider::Slack
    }

    fn set_tokens(&self, record: CredentialRecord) {
        self.tokens.set(record);
    }

    async fn exchange_code(&self, code: &str) -> Result<CredentialRecord> {
        self.oauth_access(&[
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
        ])
        .await
    }

    async fn refresh_tokens(&self, refresh_token: &str) -> Result<Option<CredentialRecord>> {
        let record = self
            .oauth_access(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;
        Ok(Some(record))
    }
}

#[async_trait]
impl ChatSource for SlackClient {
    async fn recent_mentions(&self) -> Result<Vec<ChatMessage>> {
        let token = self.tokens.access_token()?;

        let mut messages = self.fetch_search_matches(&token).await?;

        match self.fetch_saved_messages(&token).await {
            Ok(saved) => messages.extend(saved),
            Err(err) => {
                warn!(error = %err, "failed to fetch saved messages; continuing with mentions only");
            }
        }

        // A saved message that also matched search keeps its first (higher
        // scoring) appearance.
        let mut seen = HashSet::new();
        messages.retain(|m| seen.insert(m.id.clone()));

        Ok(messages)
    }
}

#[async_trait]
impl ChatNotifier for SlackClient {
    async fn post_reply(&self, channel: &str, thread_ts: &str, text: &str) -> Result<()> {
        let token = self.tokens.access_token()?;
        let url = format!("{}/chat.postMessage", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({
                "channel": channel,
                "thread_ts": thread_ts,
                "text": text,
            }))
            .send()
            .await
            .map_err(|e| map_request_error(e, "slack reply"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, "slack reply", &body));
        }

        let payload: Envelope =
            response.json().await.map_err(|e| map_parse_error(e, "slack reply"))?;
        ensure_ok(payload.ok, payload.error, "slack reply")
    }

    async fn add_reaction(&self, channel: &str, timestamp: &str, name: &str) -> Result<()> {
        self.reaction_call("reactions.add", channel, timestamp, name, "already_reacted").await
    }

    async fn remove_reaction(&self, channel: &str, timestamp: &str, name: &str) -> Result<()> {
        self.reaction_call("reactions.remove", channel, timestamp, name, "no_reaction").await
    }
}

/// Map Slack's `ok`/`error` envelope to the error taxonomy.
fn ensure_ok(ok: bool, error: Option<String>, context: &str) -> Result<()> {
    if ok {
        return Ok(());
    }

    let code = error.unwrap_or_else(|| "unknown_error".to_string());
    if AUTH_ERROR_CODES.contains(&code.as_str()) {
        Err(BeaconError::Auth(format!("{context} unauthorized: {code}")))
    } else {
        Err(BeaconError::Network(format!("{context} failed: {code}")))
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthAccessResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    authed_user: Option<AuthedUser>,
}

#[derive(Debug, Deserialize)]
struct AuthedUser {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    messages: Option<SearchMessages>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchMessages {
    #[serde(default)]
    matches: Vec<SearchMatch>,
}

#[derive(Debug, Deserialize)]
struct SearchMatch {
    ts: String,
    text: String,
    #[serde(default)]
    user: Option<String>,
    channel: ChannelRef,
}

#[derive(Debug, Deserialize)]
struct ChannelRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StarsResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    items: Vec<StarItem>,
}

#[derive(Debug, Deserialize)]
struct StarItem {
    #[serde(rename = "type")]
    item_type: String,
    #[serde(default)]
    message: Option<StarMessage>,
}

#[derive(Debug, Deserialize)]
struct StarMessage {
    ts: String,
    text: String,
    #[serde(default)]
    user: Option<String>,
    channel: String,
}

#[cfg(test)]
mod tests {
    //! HTTP-level tests for the Slack client.
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_client(base_url: &str) -> SlackClient {
        let client = SlackClient::with_base_url(
            SlackConfig {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
                user_id: "U123".to_string(),
            },
            base_url,
        )
        .unwrap();
        client.set_tokens(CredentialRecord::new(
            Provider::Slack,
            "xoxp-token".to_string(),
            None,
            None,
        ));
        client
    }

    #[tokio::test]
    async fn mentions_and_dms_are_classified_by_channel() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "messages": { "matches": [
                    { "ts": "1749540000.000100", "text": "can you look at this?",
                      "user": "U999", "channel": { "id": "C123" } },
                    { "ts": "1749540001.000100", "text": "quick question",
                      "user": "U998", "channel": { "id": "D456" } }
                ]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/stars.list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "items": [
                    { "type": "message", "message": {
                        "ts": "1749540002.000100", "text": "remember this",
                        "user": "U997", "channel": "C789" } }
                ]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let messages = client.recent_mentions().await.unwrap();

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].kind, ChatMessageKind::Mention);
        assert_eq!(messages[1].kind, ChatMessageKind::Dm);
        assert_eq!(messages[2].kind, ChatMessageKind::Saved);
    }

    #[tokio::test]
    async fn invalid_auth_envelope_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false, "error": "invalid_auth"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.recent_mentions().await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn saved_messages_failure_degrades_to_mentions_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "messages": { "matches": [
                    { "ts": "1.0", "text": "hi", "user": "U1", "channel": { "id": "C1" } }
                ]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/stars.list"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let messages = client.recent_mentions().await.unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn already_reacted_is_tolerated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/reactions.add"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false, "error": "already_reacted"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        assert!(client.add_reaction("C1", "1.0", "white_check_mark").await.is_ok());
    }

    #[tokio::test]
    async fn exchange_prefers_the_user_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth.v2.access"))
            .and(body_string_contains("code=auth-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "access_token": "xoxb-bot",
                "authed_user": {
                    "access_token": "xoxp-user",
                    "refresh_token": "xoxe-refresh",
                    "expires_in": 43200
                }
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let record = client.exchange_code("auth-code").await.unwrap();

        assert_eq!(record.access_token, "xoxp-user");
        assert_eq!(record.refresh_token, Some("xoxe-refresh".to_string()));
        assert!(record.expires_at.is_some());
    }

    #[tokio::test]
    async fn post_reply_surfaces_channel_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false, "error": "channel_not_found"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.post_reply("C404", "1.0", "hello").await.unwrap_err();
        assert!(matches!(err, BeaconError::Network(_)));
    }
}

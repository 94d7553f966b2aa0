//! Remote inbound queue client
//!
//! Talks to the webhook-backed relay that buffers pending cross-device
//! requests: `GET /pending-tasks` for the current batch and
//! `POST /pending-tasks` to acknowledge one item as processed.

use async_trait::async_trait;
use beacon_core::InboundQueue;
use beacon_domain::{BeaconError, PendingInboundItem, RelayConfig, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::integrations::{map_parse_error, map_request_error, map_status_error};

/// REST client for the relay's pending-task queue.
pub struct RelayQueueClient {
    http: Client,
    base_url: String,
}

impl RelayQueueClient {
    /// Create a client for the configured relay.
    ///
    /// # Errors
    /// Returns `BeaconError::Config` when the config fails validation or
    /// the base URL does not parse.
    pub fn new(config: RelayConfig) -> Result<Self> {
        config.validate()?;
        Url::parse(&config.base_url).map_err(|e| {
            BeaconError::Config(format!("invalid relay base url '{}': {e}", config.base_url))
        })?;
        Ok(Self { http: Client::new(), base_url: config.base_url.trim_end_matches('/').to_string() })
    }
}

#[async_trait]
impl InboundQueue for RelayQueueClient {
    async fn fetch_pending(&self) -> Result<Vec<PendingInboundItem>> {
        let url = format!("{}/pending-tasks", self.base_url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| map_request_error(e, "relay pending-tasks"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, "relay pending-tasks", &body));
        }

        let payload: PendingTasksResponse =
            response.json().await.map_err(|e| map_parse_error(e, "relay pending-tasks"))?;

        if !payload.success {
            return Err(BeaconError::Network("relay reported pending-tasks failure".to_string()));
        }

        debug!(count = payload.tasks.len(), "fetched pending inbound items");
        Ok(payload.tasks)
    }

    async fn acknowledge(&self, item_id: &str) -> Result<()> {
        let url = format!("{}/pending-tasks", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "taskId": item_id }))
            .send()
            .await
            .map_err(|e| map_request_error(e, "relay acknowledge"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, "relay acknowledge", &body));
        }

        let payload: AckResponse =
            response.json().await.map_err(|e| map_parse_error(e, "relay acknowledge"))?;

        if !payload.success {
            return Err(BeaconError::Network(format!(
                "relay refused acknowledgement for item {item_id}"
            )));
        }

        debug!(item_id, "inbound item acknowledged");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct PendingTasksResponse {
    success: bool,
    #[serde(default)]
    tasks: Vec<PendingInboundItem>,
}

#[derive(Debug, Deserialize)]
struct AckResponse {
    success: bool,
}

#[cfg(test)]
mod tests {
    //! HTTP-level tests for the relay queue client.
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> RelayQueueClient {
        RelayQueueClient::new(RelayConfig { base_url: server.uri() }).unwrap()
    }

    #[tokio::test]
    async fn fetches_pending_items_in_wire_format() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pending-tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "tasks": [{
                    "id": "item-1",
                    "title": "Ship the report",
                    "channel": "C123",
                    "messageTs": "1749540000.000100",
                    "user": "U999",
                    "teamId": "T42",
                    "shouldCreateJira": true,
                    "shouldCreateConfluence": false
                }]
            })))
            .mount(&server)
            .await;

        let items = client(&server).fetch_pending().await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "item-1");
        assert!(items[0].should_create_jira);
        assert!(!items[0].should_create_confluence);
        assert_eq!(items[0].message_ts, "1749540000.000100");
    }

    #[tokio::test]
    async fn unsuccessful_envelope_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pending-tasks"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "success": false, "tasks": [] })),
            )
            .mount(&server)
            .await;

        assert!(client(&server).fetch_pending().await.is_err());
    }

    #[tokio::test]
    async fn acknowledge_posts_the_item_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pending-tasks"))
            .and(body_string_contains("\"taskId\":\"item-1\""))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "success": true })),
            )
            .mount(&server)
            .await;

        assert!(client(&server).acknowledge("item-1").await.is_ok());
    }
}

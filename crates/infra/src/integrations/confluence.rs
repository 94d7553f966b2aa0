//! Confluence Cloud wiki implementation
//!
//! API-token (basic auth) client like the Jira one; creates storage-format
//! pages in the configured space.

use async_trait::async_trait;
use beacon_core::WikiPublisher;
use beacon_domain::{ConfluenceConfig, CreatedLink, PageRequest, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::integrations::{map_parse_error, map_request_error, map_status_error};

/// Confluence Cloud REST client.
pub struct ConfluenceClient {
    http: Client,
    config: ConfluenceConfig,
    base_url: String,
}

impl ConfluenceClient {
    /// Create a client for the configured site.
    ///
    /// # Errors
    /// Returns `BeaconError::Config` when the config fails validation.
    pub fn new(config: ConfluenceConfig) -> Result<Self> {
        let base_url = format!("https://{}", config.domain);
        Self::with_base_url(config, base_url)
    }

    /// Create a client against a custom API base (tests).
    ///
    /// # Errors
    /// Returns `BeaconError::Config` when the config fails validation.
    pub fn with_base_url(config: ConfluenceConfig, base_url: impl Into<String>) -> Result<Self> {
        config.validate()?;
        Ok(Self { http: Client::new(), config, base_url: base_url.into() })
    }
}

#[async_trait]
impl WikiPublisher for ConfluenceClient {
    async fn create_page(&self, request: PageRequest) -> Result<CreatedLink> {
        let url = format!("{}/wiki/rest/api/content", self.base_url);

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.email, Some(&self.config.api_token))
            .json(&serde_json::json!({
                "type": "page",
                "title": request.title,
                "space": { "key": self.config.space_key },
                "body": {
                    "storage": {
                        "value": format!("<p>{}</p>", request.body),
                        "representation": "storage",
                    }
                }
            }))
            .send()
            .await
            .map_err(|e| map_request_error(e, "confluence page"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, "confluence page", &body));
        }

        let created: CreatedPage =
            response.json().await.map_err(|e| map_parse_error(e, "confluence page"))?;

        let url = match (&created.links.base, &created.links.webui) {
            (Some(base), Some(webui)) => format!("{base}{webui}"),
            (None, Some(webui)) => format!("{}/wiki{webui}", self.base_url),
            _ => format!("{}/wiki/pages/{}", self.base_url, created.id),
        };

        info!(page_id = %created.id, "confluence page created");
        Ok(CreatedLink { key: created.id, url })
    }
}

#[derive(Debug, Deserialize)]
struct CreatedPage {
    id: String,
    #[serde(rename = "_links", default)]
    links: PageLinks,
}

#[derive(Debug, Default, Deserialize)]
struct PageLinks {
    #[serde(default)]
    base: Option<String>,
    #[serde(default)]
    webui: Option<String>,
}

#[cfg(test)]
mod tests {
    //! HTTP-level tests for the Confluence client.
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_config() -> ConfluenceConfig {
        ConfluenceConfig {
            domain: "acme.atlassian.net".to_string(),
            email: "bot@acme.dev".to_string(),
            api_token: "secret".to_string(),
            space_key: "ENG".to_string(),
        }
    }

    #[tokio::test]
    async fn creates_page_and_resolves_link() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/wiki/rest/api/content"))
            .and(body_string_contains("\"key\":\"ENG\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "98765",
                "_links": {
                    "base": "https://acme.atlassian.net/wiki",
                    "webui": "/spaces/ENG/pages/98765"
                }
            })))
            .mount(&server)
            .await;

        let client = ConfluenceClient::with_base_url(test_config(), server.uri()).unwrap();
        let link = client
            .create_page(PageRequest {
                title: "Ship the report".to_string(),
                body: "Notes from Slack".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(link.key, "98765");
        assert_eq!(link.url, "https://acme.atlassian.net/wiki/spaces/ENG/pages/98765");
    }

    #[tokio::test]
    async fn forbidden_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/wiki/rest/api/content"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = ConfluenceClient::with_base_url(test_config(), server.uri()).unwrap();
        let err = client
            .create_page(PageRequest { title: "t".to_string(), body: "b".to_string() })
            .await
            .unwrap_err();
        assert!(err.is_auth());
    }
}

//! Jira Cloud issue tracker implementation
//!
//! Authenticates with the `{domain, email, api_token}` configuration
//! (basic auth), not OAuth, so this client sits outside the credential
//! refresh lifecycle.

use async_trait::async_trait;
use beacon_core::IssueTracker;
use beacon_domain::{CreatedLink, IssueRequest, JiraConfig, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::integrations::{map_parse_error, map_request_error, map_status_error};

/// Jira Cloud REST client.
#[derive(Debug)]
pub struct JiraClient {
    http: Client,
    config: JiraConfig,
    base_url: String,
}

impl JiraClient {
    /// Create a client for the configured site.
    ///
    /// # Errors
    /// Returns `BeaconError::Config` when the config fails validation.
    pub fn new(config: JiraConfig) -> Result<Self> {
        let base_url = format!("https://{}", config.domain);
        Self::with_base_url(config, base_url)
    }

    /// Create a client against a custom API base (tests).
    ///
    /// # Errors
    /// Returns `BeaconError::Config` when the config fails validation.
    pub fn with_base_url(config: JiraConfig, base_url: impl Into<String>) -> Result<Self> {
        config.validate()?;
        Ok(Self { http: Client::new(), config, base_url: base_url.into() })
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn create_issue(&self, request: IssueRequest) -> Result<CreatedLink> {
        let url = format!("{}/rest/api/2/issue", self.base_url);

        let mut fields = serde_json::json!({
            "project": { "key": self.config.project_key },
            "summary": request.summary,
            "description": request.description,
            "issuetype": { "name": "Task" },
        });
        if let Some(email) = &request.assignee_email {
            fields["assignee"] = serde_json::json!({ "emailAddress": email });
        }

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.email, Some(&self.config.api_token))
            .json(&serde_json::json!({ "fields": fields }))
            .send()
            .await
            .map_err(|e| map_request_error(e, "jira issue"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, "jira issue", &body));
        }

        let created: CreatedIssue =
            response.json().await.map_err(|e| map_parse_error(e, "jira issue"))?;

        let link = CreatedLink {
            url: format!("{}/browse/{}", self.base_url, created.key),
            key: created.key,
        };
        info!(key = %link.key, "jira issue created");
        Ok(link)
    }
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    key: String,
}

#[cfg(test)]
mod tests {
    //! HTTP-level tests for the Jira client.
    use beacon_domain::BeaconError;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_config() -> JiraConfig {
        JiraConfig {
            domain: "acme.atlassian.net".to_string(),
            email: "bot@acme.dev".to_string(),
            api_token: "secret".to_string(),
            project_key: "AMP".to_string(),
        }
    }

    fn issue_request() -> IssueRequest {
        IssueRequest {
            summary: "Ship the report".to_string(),
            description: "Requested from Slack".to_string(),
            assignee_email: None,
        }
    }

    #[tokio::test]
    async fn creates_issue_and_builds_browse_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/api/2/issue"))
            .and(header_exists("authorization"))
            .and(body_string_contains("\"key\":\"AMP\""))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({ "id": "10001", "key": "AMP-42" })),
            )
            .mount(&server)
            .await;

        let client = JiraClient::with_base_url(test_config(), server.uri()).unwrap();
        let link = client.create_issue(issue_request()).await.unwrap();

        assert_eq!(link.key, "AMP-42");
        assert!(link.url.ends_with("/browse/AMP-42"));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/api/2/issue"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = JiraClient::with_base_url(test_config(), server.uri()).unwrap();
        let err = client.create_issue(issue_request()).await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_at_construction() {
        let mut config = test_config();
        config.api_token = String::new();

        let err = JiraClient::new(config).unwrap_err();
        assert!(matches!(err, BeaconError::Config(_)));
    }
}

//! Provider configuration
//!
//! Each provider gets an explicit configuration struct validated at
//! construction. Absence of a provider is represented by the enclosing
//! `Option`, not by empty fields.

use serde::{Deserialize, Serialize};

use crate::errors::{BeaconError, Result};

fn require(field: &str, value: &str, section: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BeaconError::Config(format!("{section}: {field} must not be empty")));
    }
    Ok(())
}

/// Google OAuth application credentials (shared by Calendar and Gmail).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
}

impl GoogleConfig {
    /// Validate required fields.
    pub fn validate(&self) -> Result<()> {
        require("client_id", &self.client_id, "google")?;
        require("client_secret", &self.client_secret, "google")
    }
}

/// Slack OAuth application credentials plus the authed user's id, used to
/// build the mention search query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    pub client_id: String,
    pub client_secret: String,
    pub user_id: String,
}

impl SlackConfig {
    /// Validate required fields.
    pub fn validate(&self) -> Result<()> {
        require("client_id", &self.client_id, "slack")?;
        require("client_secret", &self.client_secret, "slack")?;
        require("user_id", &self.user_id, "slack")
    }
}

/// Jira Cloud API-token configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraConfig {
    /// Site domain, e.g. `acme.atlassian.net`.
    pub domain: String,
    pub email: String,
    pub api_token: String,
    pub project_key: String,
}

impl JiraConfig {
    /// Validate required fields.
    pub fn validate(&self) -> Result<()> {
        require("domain", &self.domain, "jira")?;
        require("email", &self.email, "jira")?;
        require("api_token", &self.api_token, "jira")?;
        require("project_key", &self.project_key, "jira")
    }
}

/// Confluence Cloud API-token configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfluenceConfig {
    /// Site domain, e.g. `acme.atlassian.net`.
    pub domain: String,
    pub email: String,
    pub api_token: String,
    pub space_key: String,
}

impl ConfluenceConfig {
    /// Validate required fields.
    pub fn validate(&self) -> Result<()> {
        require("domain", &self.domain, "confluence")?;
        require("email", &self.email, "confluence")?;
        require("api_token", &self.api_token, "confluence")?;
        require("space_key", &self.space_key, "confluence")
    }
}

/// Zoom OAuth application credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoomConfig {
    pub client_id: String,
    pub client_secret: String,
}

impl ZoomConfig {
    /// Validate required fields.
    pub fn validate(&self) -> Result<()> {
        require("client_id", &self.client_id, "zoom")?;
        require("client_secret", &self.client_secret, "zoom")
    }
}

/// Remote inbound queue (relay) endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub base_url: String,
}

impl RelayConfig {
    /// Validate required fields.
    pub fn validate(&self) -> Result<()> {
        require("base_url", &self.base_url, "relay")
    }
}

/// Top-level application configuration.
///
/// A `None` provider section means "not configured"; the session coordinator
/// leaves that provider disconnected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeaconConfig {
    #[serde(default)]
    pub google: Option<GoogleConfig>,
    #[serde(default)]
    pub slack: Option<SlackConfig>,
    #[serde(default)]
    pub jira: Option<JiraConfig>,
    #[serde(default)]
    pub confluence: Option<ConfluenceConfig>,
    #[serde(default)]
    pub zoom: Option<ZoomConfig>,
    #[serde(default)]
    pub relay: Option<RelayConfig>,
    #[serde(default = "BeaconConfig::default_poll_interval")]
    pub poll_interval_seconds: u64,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            google: None,
            slack: None,
            jira: None,
            confluence: None,
            zoom: None,
            relay: None,
            poll_interval_seconds: Self::default_poll_interval(),
        }
    }
}

impl BeaconConfig {
    fn default_poll_interval() -> u64 {
        10
    }

    /// Validate every present provider section.
    pub fn validate(&self) -> Result<()> {
        if let Some(google) = &self.google {
            google.validate()?;
        }
        if let Some(slack) = &self.slack {
            slack.validate()?;
        }
        if let Some(jira) = &self.jira {
            jira.validate()?;
        }
        if let Some(confluence) = &self.confluence {
            confluence.validate()?;
        }
        if let Some(zoom) = &self.zoom {
            zoom.validate()?;
        }
        if let Some(relay) = &self.relay {
            relay.validate()?;
        }
        if self.poll_interval_seconds == 0 {
            return Err(BeaconError::Config(
                "poll_interval_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

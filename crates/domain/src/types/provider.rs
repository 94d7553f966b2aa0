//! Provider identity and OAuth credential types
//!
//! A [`CredentialRecord`] is the at-rest shape of one provider session:
//! access token, optional refresh token, and optional absolute expiry. One
//! record exists per connected provider, keyed by provider name in the
//! settings store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{BeaconError, Result};

/// External SaaS integration identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Slack,
    Zoom,
    Jira,
    Confluence,
}

impl Provider {
    /// Stable lowercase name used in store keys and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Slack => "slack",
            Self::Zoom => "zoom",
            Self::Jira => "jira",
            Self::Confluence => "confluence",
        }
    }

    /// Providers that carry an OAuth credential record.
    ///
    /// Jira and Confluence authenticate with static API-token configuration
    /// and never hold a [`CredentialRecord`].
    #[must_use]
    pub fn oauth_providers() -> [Provider; 3] {
        [Self::Google, Self::Slack, Self::Zoom]
    }

    /// Settings-store key for the provider's access token.
    #[must_use]
    pub fn access_token_key(&self) -> String {
        format!("{}_access_token", self.as_str())
    }

    /// Settings-store key for the provider's refresh token.
    #[must_use]
    pub fn refresh_token_key(&self) -> String {
        format!("{}_refresh_token", self.as_str())
    }

    /// Settings-store key for the provider's token expiry timestamp.
    #[must_use]
    pub fn expires_at_key(&self) -> String {
        format!("{}_expires_at", self.as_str())
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = BeaconError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "google" => Ok(Self::Google),
            "slack" => Ok(Self::Slack),
            "zoom" => Ok(Self::Zoom),
            "jira" => Ok(Self::Jira),
            "confluence" => Ok(Self::Confluence),
            other => Err(BeaconError::InvalidInput(format!("unknown provider: {other}"))),
        }
    }
}

/// OAuth access and refresh tokens for one provider
///
/// Refresh token is optional because some providers do not issue one.
/// `expires_at` is absolute (UTC), calculated from the provider's
/// `expires_in` at exchange/refresh time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub provider: Provider,
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    /// Create a new record with an expiry calculated from `expires_in`
    /// seconds.
    #[must_use]
    pub fn new(
        provider: Provider,
        access_token: String,
        refresh_token: Option<String>,
        expires_in: Option<i64>,
    ) -> Self {
        let expires_at = expires_in
            .filter(|secs| *secs > 0)
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));

        Self { provider, access_token, refresh_token, expires_at }
    }

    /// A provider is connected iff its access token is present and non-empty.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// Check whether the access token is expired, or will expire within
    /// `threshold_seconds`.
    ///
    /// Records without an expiry are never considered expired.
    #[must_use]
    pub fn is_expired(&self, threshold_seconds: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                Utc::now() + chrono::Duration::seconds(threshold_seconds) >= expires_at
            }
            None => false,
        }
    }

    /// Merge a refreshed token response over this record.
    ///
    /// Providers that rotate refresh tokens return a new one; providers that
    /// don't omit it, in which case the previous refresh token is preserved.
    #[must_use]
    pub fn refreshed(&self, response: TokenResponse) -> Self {
        Self {
            provider: self.provider,
            access_token: response.access_token,
            refresh_token: response.refresh_token.or_else(|| self.refresh_token.clone()),
            expires_at: response
                .expires_in
                .filter(|secs| *secs > 0)
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
        }
    }
}

/// Token response from a provider's OAuth endpoint (RFC 6749).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    /// Convert into a [`CredentialRecord`] for the given provider.
    #[must_use]
    pub fn into_record(self, provider: Provider) -> CredentialRecord {
        CredentialRecord::new(provider, self.access_token, self.refresh_token, self.expires_in)
    }
}

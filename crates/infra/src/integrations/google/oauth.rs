//! Google OAuth token endpoint client
//!
//! One shared exchanger for both Google-backed clients (Calendar and
//! Gmail), which ride a single credential. Only the token endpoint lives
//! here; the authorization step happens outside this core and hands us the
//! code.

use std::sync::Arc;

use beacon_domain::{CredentialRecord, GoogleConfig, Provider, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::integrations::{map_parse_error, map_request_error, map_status_error};

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
// Desktop-app flow: the shell opens the consent page and relays the code.
const REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Google token endpoint client.
pub struct GoogleOAuth {
    http: Client,
    config: GoogleConfig,
    token_url: String,
}

impl GoogleOAuth {
    /// Create a client for the production token endpoint.
    ///
    /// # Errors
    /// Returns `BeaconError::Config` when the config fails validation.
    pub fn new(config: GoogleConfig) -> Result<Arc<Self>> {
        Self::with_token_url(config, GOOGLE_TOKEN_URL)
    }

    /// Create a client against a custom token endpoint (tests).
    ///
    /// # Errors
    /// Returns `BeaconError::Config` when the config fails validation.
    pub fn with_token_url(config: GoogleConfig, token_url: impl Into<String>) -> Result<Arc<Self>> {
        config.validate()?;
        Ok(Arc::new(Self { http: Client::new(), config, token_url: token_url.into() }))
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<CredentialRecord> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", REDIRECT_URI),
            ])
            .send()
            .await
            .map_err(|e| map_request_error(e, "google token exchange"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, "google token exchange", &body));
        }

        let tokens: GoogleTokenResponse =
            response.json().await.map_err(|e| map_parse_error(e, "google token"))?;

        debug!("exchanged google authorization code");
        Ok(tokens.into_record())
    }

    /// Refresh the access token. Google does not rotate refresh tokens, so
    /// the response never carries one; the caller keeps the old one.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Option<CredentialRecord>> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| map_request_error(e, "google token refresh"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Google answers an invalid refresh token with 400 invalid_grant;
            // surface it as an auth failure so reauthorization is requested.
            if status.as_u16() == 400 && body.contains("invalid_grant") {
                return Err(beacon_domain::BeaconError::Auth(format!(
                    "google refresh token rejected: {body}"
                )));
            }
            return Err(map_status_error(status, "google token refresh", &body));
        }

        let tokens: GoogleTokenResponse =
            response.json().await.map_err(|e| map_parse_error(e, "google token"))?;

        debug!("refreshed google access token");
        Ok(Some(tokens.into_record()))
    }
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl GoogleTokenResponse {
    fn into_record(self) -> CredentialRecord {
        CredentialRecord::new(
            Provider::Google,
            self.access_token,
            self.refresh_token,
            self.expires_in,
        )
    }
}

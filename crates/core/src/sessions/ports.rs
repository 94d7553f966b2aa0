//! Port interfaces for provider sessions
//!
//! Every external collaborator of the session coordinator is a trait here:
//! the settings/credential store, one client per provider data surface, and
//! the token-less config-auth creators (Jira, Confluence).

use async_trait::async_trait;
use beacon_domain::{
    BeaconError, CalendarEvent, ChatMessage, CreatedLink, CredentialRecord, EmailMessage,
    IssueRequest, Meeting, MeetingRequest, PageRequest, Provider, Result, Suggestion,
};
use chrono::{DateTime, Utc};

/// Durable key-value settings and credential store.
///
/// Access is synchronous and non-transactional; callers follow a
/// get-modify-set pattern and rely on the event loop's serial execution
/// rather than locking.
pub trait SettingsStore: Send + Sync {
    /// Read a value by key. Missing keys return `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Write a value, replacing any previous value for the key.
    fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;

    /// Remove a key. Removing a missing key is a no-op.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Credential persistence helpers layered over [`SettingsStore`].
///
/// Credentials live under `"<provider>_access_token"`,
/// `"<provider>_refresh_token"`, and `"<provider>_expires_at"`.
pub trait SettingsStoreExt {
    /// Load the credential record for a provider, if one is stored.
    fn load_credentials(&self, provider: Provider) -> Result<Option<CredentialRecord>>;

    /// Persist a credential record, replacing any previous one.
    fn save_credentials(&self, record: &CredentialRecord) -> Result<()>;

    /// Remove all stored credentials for a provider.
    fn clear_credentials(&self, provider: Provider) -> Result<()>;
}

impl<S: SettingsStore + ?Sized> SettingsStoreExt for S {
    fn load_credentials(&self, provider: Provider) -> Result<Option<CredentialRecord>> {
        let access_token = match self.get(&provider.access_token_key())? {
            Some(serde_json::Value::String(token)) if !token.is_empty() => token,
            _ => return Ok(None),
        };

        let refresh_token = match self.get(&provider.refresh_token_key())? {
            Some(serde_json::Value::String(token)) if !token.is_empty() => Some(token),
            _ => None,
        };

        let expires_at = match self.get(&provider.expires_at_key())? {
            Some(serde_json::Value::String(raw)) => DateTime::parse_from_rfc3339(&raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            _ => None,
        };

        Ok(Some(CredentialRecord { provider, access_token, refresh_token, expires_at }))
    }

    fn save_credentials(&self, record: &CredentialRecord) -> Result<()> {
        let provider = record.provider;
        self.set(
            &provider.access_token_key(),
            serde_json::Value::String(record.access_token.clone()),
        )?;

        match &record.refresh_token {
            Some(token) => {
                self.set(&provider.refresh_token_key(), serde_json::Value::String(token.clone()))?;
            }
            None => self.remove(&provider.refresh_token_key())?,
        }

        match record.expires_at {
            Some(expires_at) => self.set(
                &provider.expires_at_key(),
                serde_json::Value::String(expires_at.to_rfc3339()),
            )?,
            None => self.remove(&provider.expires_at_key())?,
        }

        Ok(())
    }

    fn clear_credentials(&self, provider: Provider) -> Result<()> {
        self.remove(&provider.access_token_key())?;
        self.remove(&provider.refresh_token_key())?;
        self.remove(&provider.expires_at_key())
    }
}

/// OAuth-backed provider client: token injection, code exchange, refresh.
///
/// Read/write operations live on the data-surface subtraits below. Clients
/// must surface authorization failures (HTTP 401 or a vendor "unauthorized"
/// code) as [`BeaconError::Auth`] so the coordinator can drive its
/// refresh-and-retry protocol.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Provider this client talks to.
    fn provider(&self) -> Provider;

    /// Replace the client's in-memory credentials.
    fn set_tokens(&self, record: CredentialRecord);

    /// Exchange an authorization code for a credential record.
    async fn exchange_code(&self, code: &str) -> Result<CredentialRecord>;

    /// Obtain refreshed credentials, or `None` if the provider issued no
    /// new token set.
    async fn refresh_tokens(&self, refresh_token: &str) -> Result<Option<CredentialRecord>>;
}

/// Calendar read surface.
#[async_trait]
pub trait CalendarSource: ProviderClient {
    /// Upcoming events within the client's configured window.
    async fn upcoming_events(&self) -> Result<Vec<CalendarEvent>>;
}

/// Mailbox read surface.
#[async_trait]
pub trait MailSource: ProviderClient {
    /// Recent inbox messages.
    async fn recent_messages(&self) -> Result<Vec<EmailMessage>>;
}

/// Chat read surface.
#[async_trait]
pub trait ChatSource: ProviderClient {
    /// Recent mentions, DMs, saved messages, and thread replies.
    async fn recent_mentions(&self) -> Result<Vec<ChatMessage>>;
}

/// Meeting scheduling surface.
#[async_trait]
pub trait MeetingScheduler: ProviderClient {
    /// Schedule a meeting for the authed user.
    async fn create_meeting(&self, request: MeetingRequest) -> Result<Meeting>;
}

/// Issue-tracker write surface (config-token auth, no OAuth lifecycle).
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Create an issue and return its key and browse URL.
    async fn create_issue(&self, request: IssueRequest) -> Result<CreatedLink>;
}

/// Wiki write surface (config-token auth, no OAuth lifecycle).
#[async_trait]
pub trait WikiPublisher: Send + Sync {
    /// Create a page and return its id and URL.
    async fn create_page(&self, request: PageRequest) -> Result<CreatedLink>;
}

/// Produces the full ranked suggestion list. Implemented by the session
/// coordinator and consumed by the suggestion cache.
#[async_trait]
pub trait SuggestionFetcher: Send + Sync {
    /// Fetch and rank suggestions from all connected sources.
    async fn fetch_suggestions(&self) -> Result<Vec<Suggestion>>;
}

/// Convenience constructor for the fail-fast "not connected" error.
#[must_use]
pub fn not_connected(provider: Provider) -> BeaconError {
    BeaconError::NotConnected(format!(
        "{provider} is not connected; connect the provider before syncing"
    ))
}

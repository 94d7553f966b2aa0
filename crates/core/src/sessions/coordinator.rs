//! Session coordinator - per-provider credential lifecycle
//!
//! Single place that knows, per provider, whether a usable session exists,
//! and the single implementation of the expired-credential retry policy:
//! on an authorization error, refresh exactly once, retry exactly once, and
//! propagate the second failure.
//!
//! Provider clients are injected at construction; the coordinator owns the
//! explicit [`SessionState`] instead of ambient module-level handles.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use beacon_domain::{
    BeaconError, CalendarEvent, ChatMessage, CredentialRecord, EmailMessage, Meeting,
    MeetingRequest, Provider, Result, Suggestion,
};
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use super::ports::{
    not_connected, CalendarSource, ChatSource, MailSource, MeetingScheduler, ProviderClient,
    SettingsStore, SettingsStoreExt, SuggestionFetcher,
};
use crate::suggestions::engine;

/// In-memory session state owned by the coordinator.
#[derive(Debug, Default, Clone)]
pub struct SessionState {
    credentials: HashMap<Provider, CredentialRecord>,
    needs_reauth: HashSet<Provider>,
}

/// Coordinates provider sessions: token persistence, hot-swapping client
/// credentials, and the refresh-and-retry protocol.
pub struct SessionCoordinator {
    store: Arc<dyn SettingsStore>,
    calendar: Arc<dyn CalendarSource>,
    mail: Arc<dyn MailSource>,
    chat: Arc<dyn ChatSource>,
    meetings: Arc<dyn MeetingScheduler>,
    state: RwLock<SessionState>,
}

impl SessionCoordinator {
    /// Create a coordinator over the injected store and provider clients.
    pub fn new(
        store: Arc<dyn SettingsStore>,
        calendar: Arc<dyn CalendarSource>,
        mail: Arc<dyn MailSource>,
        chat: Arc<dyn ChatSource>,
        meetings: Arc<dyn MeetingScheduler>,
    ) -> Self {
        Self { store, calendar, mail, chat, meetings, state: RwLock::new(SessionState::default()) }
    }

    /// Load stored credentials and configure clients for every provider
    /// that has them.
    ///
    /// A provider without stored credentials is simply left unconfigured;
    /// only store failures are errors.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        for provider in Provider::oauth_providers() {
            match self.store.load_credentials(provider)? {
                Some(record) if record.is_connected() => {
                    self.configure_clients(&record);
                    self.state.write().await.credentials.insert(provider, record);
                    info!(%provider, "restored provider session from store");
                }
                _ => {
                    info!(%provider, "no stored credentials; provider left disconnected");
                }
            }
        }
        Ok(())
    }

    /// Exchange an authorization code, persist the resulting tokens, and
    /// hot-swap the in-memory client credentials.
    ///
    /// Safe to call again for an already-connected provider: the new record
    /// always replaces the old one, never merges with it.
    #[instrument(skip(self, code))]
    pub async fn connect(&self, provider: Provider, code: &str) -> Result<CredentialRecord> {
        let record = match provider {
            Provider::Google => self.calendar.exchange_code(code).await?,
            Provider::Slack => self.chat.exchange_code(code).await?,
            Provider::Zoom => self.meetings.exchange_code(code).await?,
            Provider::Jira | Provider::Confluence => {
                return Err(BeaconError::InvalidInput(format!(
                    "{provider} is configured with an API token, not an OAuth code"
                )));
            }
        };

        self.store.save_credentials(&record)?;
        self.configure_clients(&record);

        let mut state = self.state.write().await;
        state.credentials.insert(provider, record.clone());
        state.needs_reauth.remove(&provider);

        info!(%provider, "provider connected");
        Ok(record)
    }

    /// Remove stored credentials and clear the in-memory session.
    #[instrument(skip(self))]
    pub async fn disconnect(&self, provider: Provider) -> Result<()> {
        self.store.clear_credentials(provider)?;
        self.configure_clients(&CredentialRecord::new(provider, String::new(), None, None));

        let mut state = self.state.write().await;
        state.credentials.remove(&provider);
        state.needs_reauth.remove(&provider);

        info!(%provider, "provider disconnected");
        Ok(())
    }

    /// Whether the provider currently has an in-memory session.
    ///
    /// Stays `true` after a failed refresh (the cached token is kept);
    /// check [`Self::needs_reauth`] to distinguish that state.
    pub async fn is_connected(&self, provider: Provider) -> bool {
        self.state.read().await.credentials.contains_key(&provider)
    }

    /// Whether the provider's last refresh failed and the user must
    /// reauthorize.
    pub async fn needs_reauth(&self, provider: Provider) -> bool {
        self.state.read().await.needs_reauth.contains(&provider)
    }

    /// Providers with an active in-memory session.
    pub async fn connected_providers(&self) -> Vec<Provider> {
        let state = self.state.read().await;
        Provider::oauth_providers()
            .into_iter()
            .filter(|p| state.credentials.contains_key(p))
            .collect()
    }

    /// Refresh the provider's credentials, persist the new token set, and
    /// update every in-memory client that shares the credential (Calendar
    /// and Gmail both ride the Google record).
    ///
    /// A refresh that fails, or yields no new token, marks the provider as
    /// needing reauthorization and returns the error; the cached token is
    /// left in place so the caller sees the failure rather than a silent
    /// retry loop.
    #[instrument(skip(self))]
    pub async fn refresh(&self, provider: Provider) -> Result<CredentialRecord> {
        let current = self.current_credentials(provider).await?;
        let refresh_token = current.refresh_token.clone().ok_or_else(|| {
            BeaconError::Auth(format!("{provider} has no refresh token; reconnect the provider"))
        })?;

        let outcome = match provider {
            Provider::Google => self.calendar.refresh_tokens(&refresh_token).await,
            Provider::Slack => self.chat.refresh_tokens(&refresh_token).await,
            Provider::Zoom => self.meetings.refresh_tokens(&refresh_token).await,
            Provider::Jira | Provider::Confluence => {
                return Err(BeaconError::InvalidInput(format!(
                    "{provider} does not use refreshable OAuth credentials"
                )));
            }
        };

        match outcome {
            Ok(Some(mut record)) => {
                // Providers that do not rotate refresh tokens omit them from
                // the refresh response; keep the previous one.
                if record.refresh_token.is_none() {
                    record.refresh_token = Some(refresh_token);
                }

                self.store.save_credentials(&record)?;
                self.configure_clients(&record);

                let mut state = self.state.write().await;
                state.credentials.insert(provider, record.clone());
                state.needs_reauth.remove(&provider);

                info!(%provider, "credentials refreshed");
                Ok(record)
            }
            Ok(None) => {
                self.state.write().await.needs_reauth.insert(provider);
                Err(BeaconError::Auth(format!(
                    "{provider} refresh returned no credentials; reauthorization required"
                )))
            }
            Err(err) => {
                warn!(%provider, error = %err, "credential refresh failed");
                self.state.write().await.needs_reauth.insert(provider);
                Err(err)
            }
        }
    }

    /// Fetch upcoming calendar events, refreshing credentials once on an
    /// authorization error.
    #[instrument(skip(self))]
    pub async fn sync_calendar(&self) -> Result<Vec<CalendarEvent>> {
        self.current_credentials(Provider::Google).await?;

        match self.calendar.upcoming_events().await {
            Err(err) if err.is_auth() => {
                warn!(provider = %Provider::Google, error = %err, "calendar sync unauthorized; refreshing once");
                self.refresh(Provider::Google).await?;
                self.calendar.upcoming_events().await
            }
            other => other,
        }
    }

    /// Fetch recent inbox messages, refreshing credentials once on an
    /// authorization error.
    #[instrument(skip(self))]
    pub async fn sync_gmail(&self) -> Result<Vec<EmailMessage>> {
        self.current_credentials(Provider::Google).await?;

        match self.mail.recent_messages().await {
            Err(err) if err.is_auth() => {
                warn!(provider = %Provider::Google, error = %err, "gmail sync unauthorized; refreshing once");
                self.refresh(Provider::Google).await?;
                self.mail.recent_messages().await
            }
            other => other,
        }
    }

    /// Fetch recent chat mentions, refreshing credentials once on an
    /// authorization error.
    #[instrument(skip(self))]
    pub async fn sync_slack(&self) -> Result<Vec<ChatMessage>> {
        self.current_credentials(Provider::Slack).await?;

        match self.chat.recent_mentions().await {
            Err(err) if err.is_auth() => {
                warn!(provider = %Provider::Slack, error = %err, "slack sync unauthorized; refreshing once");
                self.refresh(Provider::Slack).await?;
                self.chat.recent_mentions().await
            }
            other => other,
        }
    }

    /// Schedule a meeting, refreshing credentials once on an authorization
    /// error.
    #[instrument(skip(self, request))]
    pub async fn create_meeting(&self, request: MeetingRequest) -> Result<Meeting> {
        self.current_credentials(Provider::Zoom).await?;

        match self.meetings.create_meeting(request.clone()).await {
            Err(err) if err.is_auth() => {
                warn!(provider = %Provider::Zoom, error = %err, "meeting creation unauthorized; refreshing once");
                self.refresh(Provider::Zoom).await?;
                self.meetings.create_meeting(request).await
            }
            other => other,
        }
    }

    /// Fan out to all suggestion sources and rank the merged results.
    ///
    /// Each source failure degrades to an empty list for that source so one
    /// broken integration cannot blank the whole feed; the swallow is
    /// explicit here, not hidden in the sync calls.
    #[instrument(skip(self))]
    pub async fn get_smart_suggestions(&self) -> Result<Vec<Suggestion>> {
        let (events, emails, messages) = tokio::join!(
            self.calendar_or_empty(),
            self.emails_or_empty(),
            self.mentions_or_empty(),
        );

        Ok(engine::rank(&events, &emails, &messages, Utc::now()))
    }

    async fn calendar_or_empty(&self) -> Vec<CalendarEvent> {
        match self.sync_calendar().await {
            Ok(events) => events,
            Err(err) => {
                warn!(source = "calendar", error = %err, "suggestion source failed; using empty list");
                Vec::new()
            }
        }
    }

    async fn emails_or_empty(&self) -> Vec<EmailMessage> {
        match self.sync_gmail().await {
            Ok(emails) => emails,
            Err(err) => {
                warn!(source = "email", error = %err, "suggestion source failed; using empty list");
                Vec::new()
            }
        }
    }

    async fn mentions_or_empty(&self) -> Vec<ChatMessage> {
        match self.sync_slack().await {
            Ok(messages) => messages,
            Err(err) => {
                warn!(source = "slack", error = %err, "suggestion source failed; using empty list");
                Vec::new()
            }
        }
    }

    /// Push a credential record into every client that depends on it.
    fn configure_clients(&self, record: &CredentialRecord) {
        match record.provider {
            Provider::Google => {
                self.calendar.set_tokens(record.clone());
                self.mail.set_tokens(record.clone());
            }
            Provider::Slack => self.chat.set_tokens(record.clone()),
            Provider::Zoom => self.meetings.set_tokens(record.clone()),
            Provider::Jira | Provider::Confluence => {}
        }
    }

    async fn current_credentials(&self, provider: Provider) -> Result<CredentialRecord> {
        self.state
            .read()
            .await
            .credentials
            .get(&provider)
            .cloned()
            .ok_or_else(|| not_connected(provider))
    }
}

#[async_trait]
impl SuggestionFetcher for SessionCoordinator {
    async fn fetch_suggestions(&self) -> Result<Vec<Suggestion>> {
        self.get_smart_suggestions().await
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the session coordinator's retry protocol.
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use beacon_domain::EmailMessage;
    use tokio::sync::Mutex as TokioMutex;

    use super::*;

    #[derive(Default)]
    struct MockStore {
        values: StdMutex<HashMap<String, serde_json::Value>>,
        writes: StdMutex<Vec<String>>,
    }

    impl MockStore {
        fn write_count(&self, key: &str) -> usize {
            self.writes.lock().unwrap().iter().filter(|k| k.as_str() == key).count()
        }
    }

    impl SettingsStore for MockStore {
        fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
            Ok(self.values.lock().unwrap().get(key).cloned())
        }

        fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
            self.values.lock().unwrap().insert(key.to_string(), value);
            self.writes.lock().unwrap().push(key.to_string());
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.values.lock().unwrap().remove(key);
            Ok(())
        }
    }

    /// Scriptable provider client covering all four data surfaces.
    struct MockClient {
        provider: Provider,
        tokens: StdMutex<Option<CredentialRecord>>,
        set_tokens_calls: AtomicUsize,
        refresh_calls: AtomicUsize,
        refresh_result: StdMutex<Option<Result<Option<CredentialRecord>>>>,
        calendar_responses: TokioMutex<Vec<Result<Vec<CalendarEvent>>>>,
        email_responses: TokioMutex<Vec<Result<Vec<EmailMessage>>>>,
        chat_responses: TokioMutex<Vec<Result<Vec<ChatMessage>>>>,
    }

    impl MockClient {
        fn new(provider: Provider) -> Self {
            Self {
                provider,
                tokens: StdMutex::new(None),
                set_tokens_calls: AtomicUsize::new(0),
                refresh_calls: AtomicUsize::new(0),
                refresh_result: StdMutex::new(None),
                calendar_responses: TokioMutex::new(Vec::new()),
                email_responses: TokioMutex::new(Vec::new()),
                chat_responses: TokioMutex::new(Vec::new()),
            }
        }

        fn with_refresh(self, result: Result<Option<CredentialRecord>>) -> Self {
            *self.refresh_result.lock().unwrap() = Some(result);
            self
        }

        fn current_access_token(&self) -> Option<String> {
            self.tokens.lock().unwrap().as_ref().map(|t| t.access_token.clone())
        }

        async fn push_calendar(&self, response: Result<Vec<CalendarEvent>>) {
            self.calendar_responses.lock().await.push(response);
        }

        async fn push_emails(&self, response: Result<Vec<EmailMessage>>) {
            self.email_responses.lock().await.push(response);
        }
    }

    #[async_trait]
    impl crate::sessions::ports::ProviderClient for MockClient {
        fn provider(&self) -> Provider {
            self.provider
        }

        fn set_tokens(&self, record: CredentialRecord) {
            self.set_tokens_calls.fetch_add(1, Ordering::SeqCst);
            *self.tokens.lock().unwrap() = Some(record);
        }

        async fn exchange_code(&self, code: &str) -> Result<CredentialRecord> {
            Ok(CredentialRecord::new(
                self.provider,
                format!("access-for-{code}"),
                Some(format!("refresh-for-{code}")),
                Some(3600),
            ))
        }

        async fn refresh_tokens(
            &self,
            _refresh_token: &str,
        ) -> Result<Option<CredentialRecord>> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            self.refresh_result
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Ok(None))
        }
    }

    #[async_trait]
    impl CalendarSource for MockClient {
        async fn upcoming_events(&self) -> Result<Vec<CalendarEvent>> {
            let mut responses = self.calendar_responses.lock().await;
            if responses.is_empty() {
                Ok(Vec::new())
            } else {
                responses.remove(0)
            }
        }
    }

    #[async_trait]
    impl MailSource for MockClient {
        async fn recent_messages(&self) -> Result<Vec<EmailMessage>> {
            let mut responses = self.email_responses.lock().await;
            if responses.is_empty() {
                Ok(Vec::new())
            } else {
                responses.remove(0)
            }
        }
    }

    #[async_trait]
    impl ChatSource for MockClient {
        async fn recent_mentions(&self) -> Result<Vec<ChatMessage>> {
            let mut responses = self.chat_responses.lock().await;
            if responses.is_empty() {
                Ok(Vec::new())
            } else {
                responses.remove(0)
            }
        }
    }

    #[async_trait]
    impl MeetingScheduler for MockClient {
        async fn create_meeting(&self, _request: MeetingRequest) -> Result<Meeting> {
            Ok(Meeting { id: "m1".to_string(), join_url: "https://zoom.example/m1".to_string(), start_url: None })
        }
    }

    struct Fixture {
        store: Arc<MockStore>,
        calendar: Arc<MockClient>,
        mail: Arc<MockClient>,
        chat: Arc<MockClient>,
        coordinator: SessionCoordinator,
    }

    fn fixture_with(
        calendar: MockClient,
        mail: MockClient,
        chat: MockClient,
    ) -> Fixture {
        let store = Arc::new(MockStore::default());
        let calendar = Arc::new(calendar);
        let mail = Arc::new(mail);
        let chat = Arc::new(chat);
        let meetings = Arc::new(MockClient::new(Provider::Zoom));

        let coordinator = SessionCoordinator::new(
            store.clone(),
            calendar.clone(),
            mail.clone(),
            chat.clone(),
            meetings,
        );

        Fixture { store, calendar, mail, chat, coordinator }
    }

    fn seed_google(store: &MockStore) {
        store
            .set("google_access_token", serde_json::Value::String("stale-token".to_string()))
            .unwrap();
        store
            .set("google_refresh_token", serde_json::Value::String("refresh-1".to_string()))
            .unwrap();
        store.writes.lock().unwrap().clear();
    }

    fn google_record(access: &str) -> CredentialRecord {
        CredentialRecord::new(
            Provider::Google,
            access.to_string(),
            Some("refresh-2".to_string()),
            Some(3600),
        )
    }

    fn sample_email(id: &str, starred: bool) -> EmailMessage {
        EmailMessage {
            id: id.to_string(),
            subject: "Quarterly numbers".to_string(),
            from: "Pat Doe <pat@example.com>".to_string(),
            is_unread: false,
            is_starred: starred,
            received_at: None,
        }
    }

    #[tokio::test]
    async fn sync_fails_fast_when_never_connected() {
        let fixture = fixture_with(
            MockClient::new(Provider::Google),
            MockClient::new(Provider::Google),
            MockClient::new(Provider::Slack),
        );

        let err = fixture.coordinator.sync_calendar().await.unwrap_err();
        match err {
            BeaconError::NotConnected(msg) => {
                assert!(msg.contains("google"));
                assert!(msg.contains("connect"));
            }
            other => panic!("expected NotConnected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn sync_retries_once_after_refresh_and_writes_tokens_once() {
        let calendar = MockClient::new(Provider::Google)
            .with_refresh(Ok(Some(google_record("fresh-token"))));
        calendar
            .push_calendar(Err(BeaconError::Auth("401 unauthorized".to_string())))
            .await;
        calendar.push_calendar(Ok(Vec::new())).await;

        let fixture = fixture_with(
            calendar,
            MockClient::new(Provider::Google),
            MockClient::new(Provider::Slack),
        );
        seed_google(&fixture.store);
        fixture.coordinator.initialize().await.unwrap();
        fixture.store.writes.lock().unwrap().clear();

        let result = fixture.coordinator.sync_calendar().await;
        assert!(result.is_ok());

        // Exactly one refresh cycle, exactly one new access-token write.
        assert_eq!(fixture.calendar.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fixture.store.write_count("google_access_token"), 1);
        assert_eq!(
            fixture.calendar.current_access_token(),
            Some("fresh-token".to_string())
        );
    }

    #[tokio::test]
    async fn sync_propagates_second_error_without_looping() {
        let calendar = MockClient::new(Provider::Google)
            .with_refresh(Ok(Some(google_record("fresh-token"))));
        calendar
            .push_calendar(Err(BeaconError::Auth("first failure".to_string())))
            .await;
        calendar
            .push_calendar(Err(BeaconError::Auth("second failure".to_string())))
            .await;

        let fixture = fixture_with(
            calendar,
            MockClient::new(Provider::Google),
            MockClient::new(Provider::Slack),
        );
        seed_google(&fixture.store);
        fixture.coordinator.initialize().await.unwrap();

        let err = fixture.coordinator.sync_calendar().await.unwrap_err();
        assert!(err.to_string().contains("second failure"));
        assert_eq!(fixture.calendar.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_updates_both_google_clients() {
        let calendar = MockClient::new(Provider::Google)
            .with_refresh(Ok(Some(google_record("shared-token"))));
        let mail = MockClient::new(Provider::Google);

        let fixture = fixture_with(calendar, mail, MockClient::new(Provider::Slack));
        seed_google(&fixture.store);
        fixture.coordinator.initialize().await.unwrap();

        fixture.coordinator.refresh(Provider::Google).await.unwrap();

        assert_eq!(
            fixture.calendar.current_access_token(),
            Some("shared-token".to_string())
        );
        assert_eq!(
            fixture.mail.current_access_token(),
            Some("shared-token".to_string())
        );
    }

    #[tokio::test]
    async fn failed_refresh_sets_needs_reauth_but_keeps_session() {
        let calendar = MockClient::new(Provider::Google)
            .with_refresh(Err(BeaconError::Auth("invalid_grant".to_string())));

        let fixture = fixture_with(
            calendar,
            MockClient::new(Provider::Google),
            MockClient::new(Provider::Slack),
        );
        seed_google(&fixture.store);
        fixture.coordinator.initialize().await.unwrap();

        let err = fixture.coordinator.refresh(Provider::Google).await.unwrap_err();
        assert!(err.is_auth());
        assert!(fixture.coordinator.is_connected(Provider::Google).await);
        assert!(fixture.coordinator.needs_reauth(Provider::Google).await);
    }

    #[tokio::test]
    async fn refresh_yielding_no_tokens_is_an_error() {
        let calendar = MockClient::new(Provider::Google).with_refresh(Ok(None));

        let fixture = fixture_with(
            calendar,
            MockClient::new(Provider::Google),
            MockClient::new(Provider::Slack),
        );
        seed_google(&fixture.store);
        fixture.coordinator.initialize().await.unwrap();

        let err = fixture.coordinator.refresh(Provider::Google).await.unwrap_err();
        assert!(err.is_auth());
        assert!(fixture.coordinator.needs_reauth(Provider::Google).await);
    }

    #[tokio::test]
    async fn connect_replaces_previous_session() {
        let fixture = fixture_with(
            MockClient::new(Provider::Google),
            MockClient::new(Provider::Google),
            MockClient::new(Provider::Slack),
        );

        fixture.coordinator.connect(Provider::Google, "code-1").await.unwrap();
        fixture.coordinator.connect(Provider::Google, "code-2").await.unwrap();

        assert_eq!(
            fixture.calendar.current_access_token(),
            Some("access-for-code-2".to_string())
        );
        assert_eq!(
            fixture.mail.current_access_token(),
            Some("access-for-code-2".to_string())
        );
        assert!(fixture.coordinator.is_connected(Provider::Google).await);
    }

    #[tokio::test]
    async fn suggestion_fan_out_tolerates_partial_failure() {
        let calendar = MockClient::new(Provider::Google);
        calendar
            .push_calendar(Err(BeaconError::Network("calendar down".to_string())))
            .await;
        let mail = MockClient::new(Provider::Google);
        mail.push_emails(Ok(vec![sample_email("e1", true)])).await;

        // Slack never connected: its sync fails fast and degrades to empty.
        let fixture = fixture_with(calendar, mail, MockClient::new(Provider::Slack));
        seed_google(&fixture.store);
        fixture.coordinator.initialize().await.unwrap();

        let suggestions = fixture.coordinator.get_smart_suggestions().await.unwrap();

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].source, beacon_domain::SuggestionSource::Email);
    }

    #[tokio::test]
    async fn disconnect_clears_store_and_session() {
        let fixture = fixture_with(
            MockClient::new(Provider::Google),
            MockClient::new(Provider::Google),
            MockClient::new(Provider::Slack),
        );

        fixture.coordinator.connect(Provider::Google, "code-1").await.unwrap();
        fixture.coordinator.disconnect(Provider::Google).await.unwrap();

        assert!(!fixture.coordinator.is_connected(Provider::Google).await);
        assert!(fixture
            .store
            .get("google_access_token")
            .unwrap()
            .is_none());
    }
}

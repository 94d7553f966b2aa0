//! Google Calendar provider implementation

use std::sync::Arc;

use async_trait::async_trait;
use beacon_core::{CalendarSource, ProviderClient};
use beacon_domain::{CalendarEvent, CredentialRecord, Provider, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use super::oauth::GoogleOAuth;
use crate::integrations::{map_parse_error, map_request_error, map_status_error, TokenSlot};

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const LOOKAHEAD_DAYS: i64 = 7;
const MAX_RESULTS: u32 = 20;

/// Google Calendar client over the v3 events API.
pub struct GoogleCalendarClient {
    http: Client,
    oauth: Arc<GoogleOAuth>,
    tokens: TokenSlot,
    base_url: String,
}

impl GoogleCalendarClient {
    /// Create a client for the production API.
    pub fn new(oauth: Arc<GoogleOAuth>) -> Self {
        Self::with_base_url(oauth, CALENDAR_API_BASE)
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
}

#[async_trait]
impl ProviderClient for GoogleCalendarClient {
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
impl CalendarSource for GoogleCalendarClient {
    async fn upcoming_events(&self) -> Result<Vec<CalendarEvent>> {
        let token = self.tokens.access_token()?;
        let now = Utc::now();
        let url = format!("{}/calendars/primary/events", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("timeMin", now.to_rfc3339()),
                ("timeMax", (now + chrono::Duration::days(LOOKAHEAD_DAYS)).to_rfc3339()),
                ("maxResults", MAX_RESULTS.to_string()),
                ("timeZone", "UTC".to_string()),
            ])
            .send()
            .await
            .map_err(|e| map_request_error(e, "google calendar"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, "google calendar", &body));
        }

        let events: GoogleEventsResponse =
            response.json().await.map_err(|e| map_parse_error(e, "google calendar"))?;

        Ok(events
            .items
            .into_iter()
            .filter_map(|raw| match convert_event(raw) {
                Ok(event) => Some(event),
                Err(err) => {
                    warn!(error = %err, "skipping unparseable calendar event");
                    None
                }
            })
            .collect())
    }
}

fn convert_event(raw: GoogleCalendarEvent) -> Result<CalendarEvent> {
    let start = parse_event_time(&raw.start)?;
    let end = parse_event_time(&raw.end).ok();

    let title = raw
        .summary
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "Untitled event".to_string());

    Ok(CalendarEvent { id: raw.id, title, start, end, location: raw.location })
}

/// Timed events carry an RFC 3339 `dateTime`; all-day events carry a bare
/// `date`, which resolves to midnight UTC.
fn parse_event_time(value: &EventDateTime) -> Result<DateTime<Utc>> {
    if let Some(date_time) = &value.date_time {
        return DateTime::parse_from_rfc3339(date_time)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                beacon_domain::BeaconError::InvalidInput(format!(
                    "invalid event timestamp '{date_time}': {e}"
                ))
            });
    }

    if let Some(date) = &value.date {
        let naive = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
            beacon_domain::BeaconError::InvalidInput(format!("invalid all-day date '{date}': {e}"))
        })?;
        let midnight = naive.and_hms_opt(0, 0, 0).ok_or_else(|| {
            beacon_domain::BeaconError::InvalidInput(format!(
                "invalid all-day date '{date}': no midnight"
            ))
        })?;
        return Ok(midnight.and_utc());
    }

    Err(beacon_domain::BeaconError::InvalidInput("event has no start information".to_string()))
}

#[derive(Debug, Deserialize)]
struct GoogleEventsResponse {
    #[serde(default)]
    items: Vec<GoogleCalendarEvent>,
}

#[derive(Debug, Deserialize)]
struct GoogleCalendarEvent {
    id: String,
    summary: Option<String>,
    location: Option<String>,
    start: EventDateTime,
    #[serde(default)]
    end: EventDateTime,
}

#[derive(Debug, Default, Deserialize)]
struct EventDateTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}

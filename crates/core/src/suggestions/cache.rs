//! Time-boxed suggestion cache
//!
//! Wraps the coordinator's expensive multi-source fan-out with a day-long
//! TTL: one global cached array and one global "last fetch" timestamp,
//! both persisted through the settings store so the feed survives a
//! restart. The cache is overwritten wholesale on every refetch, never
//! merged.

use std::sync::Arc;

use beacon_domain::{Result, Suggestion};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::sessions::ports::{SettingsStore, SuggestionFetcher};

/// Store key for the cached suggestion batch.
pub const SUGGESTIONS_CACHE_KEY: &str = "smart_suggestions_cache";
/// Store key for the cache timestamp.
pub const SUGGESTIONS_LAST_FETCH_KEY: &str = "smart_suggestions_last_fetch";

const CACHE_TTL_HOURS: i64 = 24;

/// TTL cache over a [`SuggestionFetcher`].
pub struct SuggestionCache<C: Clock = SystemClock> {
    store: Arc<dyn SettingsStore>,
    fetcher: Arc<dyn SuggestionFetcher>,
    clock: C,
}

impl SuggestionCache<SystemClock> {
    /// Create a cache using the system clock.
    pub fn new(store: Arc<dyn SettingsStore>, fetcher: Arc<dyn SuggestionFetcher>) -> Self {
        Self::with_clock(store, fetcher, SystemClock)
    }
}

impl<C: Clock> SuggestionCache<C> {
    /// Create a cache with a custom clock (useful for testing).
    pub fn with_clock(
        store: Arc<dyn SettingsStore>,
        fetcher: Arc<dyn SuggestionFetcher>,
        clock: C,
    ) -> Self {
        Self { store, fetcher, clock }
    }

    /// Return cached suggestions when fresh, otherwise refetch.
    ///
    /// The cache is fresh when it is non-empty and the last fetch happened
    /// less than 24 hours ago. `force_refresh` bypasses both checks.
    #[instrument(skip(self))]
    pub async fn get(&self, force_refresh: bool) -> Result<Vec<Suggestion>> {
        if !force_refresh {
            if let Some(cached) = self.fresh_cached() {
                debug!(count = cached.len(), "returning cached suggestions");
                return Ok(cached);
            }
        }

        self.refetch().await
    }

    /// Always bypass the TTL and refetch.
    ///
    /// Used after the user acts on a suggestion so a consumed item is not
    /// immediately re-shown.
    #[instrument(skip(self))]
    pub async fn force_refresh(&self) -> Result<Vec<Suggestion>> {
        self.refetch().await
    }

    fn fresh_cached(&self) -> Option<Vec<Suggestion>> {
        let fetched_at = self.last_fetch()?;
        if self.clock.now() - fetched_at >= Duration::hours(CACHE_TTL_HOURS) {
            return None;
        }

        let suggestions = self.cached_suggestions()?;
        if suggestions.is_empty() {
            return None;
        }

        Some(suggestions)
    }

    fn last_fetch(&self) -> Option<DateTime<Utc>> {
        match self.store.get(SUGGESTIONS_LAST_FETCH_KEY) {
            Ok(Some(serde_json::Value::String(raw))) => DateTime::parse_from_rfc3339(&raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Ok(_) => None,
            Err(err) => {
                warn!(error = %err, "failed to read suggestion cache timestamp");
                None
            }
        }
    }

    fn cached_suggestions(&self) -> Option<Vec<Suggestion>> {
        match self.store.get(SUGGESTIONS_CACHE_KEY) {
            Ok(Some(value)) => serde_json::from_value(value).ok(),
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "failed to read suggestion cache");
                None
            }
        }
    }

    async fn refetch(&self) -> Result<Vec<Suggestion>> {
        let suggestions = self.fetcher.fetch_suggestions().await?;

        self.store.set(
            SUGGESTIONS_CACHE_KEY,
            serde_json::to_value(&suggestions)
                .map_err(|e| beacon_domain::BeaconError::Internal(e.to_string()))?,
        )?;
        self.store.set(
            SUGGESTIONS_LAST_FETCH_KEY,
            serde_json::Value::String(self.clock.now().to_rfc3339()),
        )?;

        debug!(count = suggestions.len(), "suggestion cache refreshed");
        Ok(suggestions)
    }
}

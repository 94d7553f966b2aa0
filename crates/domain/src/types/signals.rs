//! Source signals and suggestions
//!
//! The suggestion engine consumes three signal shapes (calendar events,
//! emails, chat messages) and emits ranked [`Suggestion`]s. Suggestions are
//! ephemeral: they are regenerated per engine invocation and only the
//! ranked batch is cached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::task::Priority;

/// Calendar event as returned by a calendar provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Email message as returned by a mail provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub id: String,
    pub subject: String,
    /// Raw From header, either `"Display Name <addr>"` or a bare address.
    pub from: String,
    pub is_unread: bool,
    pub is_starred: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
}

/// Kind of chat message surfaced by a chat provider.
///
/// Only `Mention`, `Dm`, `Saved`, and `Thread` participate in suggestions;
/// `Channel` messages are excluded by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMessageKind {
    Mention,
    Dm,
    Saved,
    Thread,
    Channel,
}

/// Chat message as returned by a chat provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub kind: ChatMessageKind,
    pub text: String,
    pub user: String,
    pub channel: String,
    /// Slack-style timestamp: Unix epoch seconds as a decimal string.
    pub timestamp: String,
}

/// Source a suggestion was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    Calendar,
    Email,
    Slack,
}

/// One ranked, actionable suggestion.
///
/// `id` is provider-prefixed and stable across regenerations for the same
/// underlying item, so dismissal-by-id keeps working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub title: String,
    pub source: SuggestionSource,
    pub source_id: String,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub score: i64,
}

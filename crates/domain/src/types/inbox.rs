//! Inbound queue and downstream creation types
//!
//! [`PendingInboundItem`] is the remote-owned record for one chat mention
//! awaiting task/ticket/page creation. It is camelCase on the wire, matching
//! the relay's JSON surface.

use serde::{Deserialize, Serialize};

/// A remotely queued chat mention requiring local action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingInboundItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub channel: String,
    pub message_ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
    pub user: String,
    pub team_id: String,
    #[serde(default)]
    pub should_create_jira: bool,
    #[serde(default)]
    pub should_create_confluence: bool,
    #[serde(default)]
    pub assignee_name: Option<String>,
    #[serde(default)]
    pub assignee_email: Option<String>,
}

/// Request to create an issue in a tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRequest {
    pub summary: String,
    pub description: String,
    #[serde(default)]
    pub assignee_email: Option<String>,
}

/// Request to create a wiki page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRequest {
    pub title: String,
    pub body: String,
}

/// Reference to an externally created ticket or page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedLink {
    /// Issue key (e.g. `AMP-42`) or page id.
    pub key: String,
    pub url: String,
}

/// Request to schedule a meeting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingRequest {
    pub topic: String,
    #[serde(default)]
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

/// A scheduled meeting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    pub join_url: String,
    #[serde(default)]
    pub start_url: Option<String>,
}

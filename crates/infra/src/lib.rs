//! # Beacon Infra
//!
//! Infrastructure layer: reqwest-based provider clients (Google Calendar,
//! Gmail, Slack, Jira, Confluence, Zoom), the JSON settings store, the
//! configuration loader, the relay queue client, and the inbound event
//! poller. Everything here implements a port trait from `beacon-core`.

pub mod config;
pub mod inbox;
pub mod integrations;
pub mod settings;
pub mod sync;

pub use inbox::relay::RelayQueueClient;
pub use integrations::confluence::ConfluenceClient;
pub use integrations::google::{GmailClient, GoogleCalendarClient, GoogleOAuth};
pub use integrations::jira::JiraClient;
pub use integrations::slack::SlackClient;
pub use integrations::zoom::ZoomClient;
pub use settings::store::JsonSettingsStore;
pub use sync::inbox_worker::{InboxWorker, InboxWorkerConfig};

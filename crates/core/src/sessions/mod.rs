//! Provider session management

pub mod coordinator;
pub mod ports;

pub use coordinator::{SessionCoordinator, SessionState};
pub use ports::{
    not_connected, CalendarSource, ChatSource, IssueTracker, MailSource, MeetingScheduler,
    ProviderClient, SettingsStore, SettingsStoreExt, SuggestionFetcher, WikiPublisher,
};

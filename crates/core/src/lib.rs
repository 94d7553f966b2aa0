//! # Beacon Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The session coordinator (per-provider credential lifecycle and the
//!   refresh-and-retry protocol)
//! - The suggestion engine and its TTL cache
//! - The store-backed task list service
//! - Port/adapter interfaces (traits) for every external collaborator
//!
//! ## Architecture Principles
//! - Only depends on `beacon-domain`
//! - No HTTP or filesystem code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod clock;
pub mod inbox;
pub mod sessions;
pub mod suggestions;
pub mod tasks;

pub use clock::{Clock, SystemClock};
pub use inbox::ports::{ChatNotifier, InboundQueue, TaskSink};
pub use sessions::coordinator::{SessionCoordinator, SessionState};
pub use sessions::ports::{
    not_connected, CalendarSource, ChatSource, IssueTracker, MailSource, MeetingScheduler,
    ProviderClient, SettingsStore, SettingsStoreExt, SuggestionFetcher, WikiPublisher,
};
pub use suggestions::cache::SuggestionCache;
pub use suggestions::engine::{rank, MAX_SUGGESTIONS};
pub use tasks::service::TaskService;

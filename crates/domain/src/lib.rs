//! # Beacon Domain
//!
//! Shared types for the Beacon productivity shell core: provider identity,
//! OAuth credential records, tasks, source signals, suggestions, inbound
//! queue items, configuration, and the error taxonomy.
//!
//! This crate has no I/O and depends only on serde/chrono/uuid/thiserror.

pub mod config;
pub mod errors;
pub mod types;

pub use config::{
    BeaconConfig, ConfluenceConfig, GoogleConfig, JiraConfig, RelayConfig, SlackConfig, ZoomConfig,
};
pub use errors::{BeaconError, Result};
pub use types::{
    CalendarEvent, ChatMessage, ChatMessageKind, CreatedLink, CredentialRecord, EmailMessage,
    IssueRequest, LinkKind, LinkedItem, Meeting, MeetingRequest, NewTask, PageRequest,
    PendingInboundItem, Priority, Provider, Suggestion, SuggestionSource, Tag, Task, TaskPatch,
    TaskSource, TokenResponse,
};

//! Common data types used throughout the application

pub mod inbox;
pub mod provider;
pub mod signals;
pub mod task;

pub use inbox::{
    CreatedLink, IssueRequest, Meeting, MeetingRequest, PageRequest, PendingInboundItem,
};
pub use provider::{CredentialRecord, Provider, TokenResponse};
pub use signals::{
    CalendarEvent, ChatMessage, ChatMessageKind, EmailMessage, Suggestion, SuggestionSource,
};
pub use task::{LinkKind, LinkedItem, NewTask, Priority, Tag, Task, TaskPatch, TaskSource};

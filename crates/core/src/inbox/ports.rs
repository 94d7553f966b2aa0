//! Port interfaces for inbound event processing
//!
//! The poller's collaborators: the remote queue of pending chat mentions,
//! the chat surface used for acknowledgement feedback, and the sink that
//! persists created tasks. Ticket/page creation reuses the
//! [`crate::sessions::ports::IssueTracker`] and
//! [`crate::sessions::ports::WikiPublisher`] ports.

use async_trait::async_trait;
use beacon_domain::{PendingInboundItem, Result, Task};

/// Remote queue of pending inbound items (poll-and-acknowledge source).
#[async_trait]
pub trait InboundQueue: Send + Sync {
    /// Fetch the current batch of pending items.
    async fn fetch_pending(&self) -> Result<Vec<PendingInboundItem>>;

    /// Mark an item processed so it is not redelivered.
    async fn acknowledge(&self, item_id: &str) -> Result<()>;
}

/// Chat feedback surface: threaded replies and reaction management.
#[async_trait]
pub trait ChatNotifier: Send + Sync {
    /// Post a threaded reply.
    async fn post_reply(&self, channel: &str, thread_ts: &str, text: &str) -> Result<()>;

    /// Add a reaction to a message.
    async fn add_reaction(&self, channel: &str, timestamp: &str, name: &str) -> Result<()>;

    /// Remove a reaction from a message.
    async fn remove_reaction(&self, channel: &str, timestamp: &str, name: &str) -> Result<()>;
}

/// Persists tasks created by the poller.
#[async_trait]
pub trait TaskSink: Send + Sync {
    /// Persist one task.
    async fn create_task(&self, task: Task) -> Result<()>;
}

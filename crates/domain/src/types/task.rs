//! Local task list types
//!
//! Tasks are stored as one ordered collection in the settings store.
//! Manual and suggestion-accepted tasks are inserted newest-first; tasks
//! created by the inbound poller are appended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Suggestion/task priority level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Where a task originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskSource {
    Manual,
    Calendar,
    Email,
    Slack,
}

/// Kind of an item linked to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Slack,
    Jira,
    Confluence,
    Calendar,
    Email,
}

/// Colored label attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub label: String,
    pub color: String,
}

/// Deep link from a task back to an external item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedItem {
    pub id: String,
    pub kind: LinkKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A task on the local list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub completed: bool,
    pub source: TaskSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linked_items: Vec<LinkedItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Build a fresh task from creation input, stamping id and timestamps.
    #[must_use]
    pub fn from_new(new: NewTask) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: new.title,
            completed: false,
            source: new.source,
            source_id: new.source_id,
            due_date: new.due_date,
            deadline: new.deadline,
            priority: new.priority,
            context: new.context,
            description: new.description,
            tags: new.tags,
            linked_items: new.linked_items,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default = "NewTask::default_source")]
    pub source: TaskSource,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default = "NewTask::default_priority")]
    pub priority: Priority,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub linked_items: Vec<LinkedItem>,
}

impl NewTask {
    /// Minimal manual task with the given title.
    #[must_use]
    pub fn manual(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source: TaskSource::Manual,
            source_id: None,
            due_date: None,
            deadline: None,
            priority: Priority::Medium,
            context: None,
            description: None,
            tags: Vec::new(),
            linked_items: Vec::new(),
        }
    }

    fn default_source() -> TaskSource {
        TaskSource::Manual
    }

    fn default_priority() -> Priority {
        Priority::Medium
    }
}

/// Partial task update. `None` fields are left untouched; every applied
/// patch refreshes `updated_at`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<Tag>>,
    #[serde(default)]
    pub linked_items: Option<Vec<LinkedItem>>,
}

impl TaskPatch {
    /// Apply this patch to a task, refreshing `updated_at`.
    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(deadline) = self.deadline {
            task.deadline = Some(deadline);
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(context) = self.context {
            task.context = Some(context);
        }
        if let Some(description) = self.description {
            task.description = Some(description);
        }
        if let Some(tags) = self.tags {
            task.tags = tags;
        }
        if let Some(linked_items) = self.linked_items {
            task.linked_items = linked_items;
        }
        task.updated_at = Utc::now();
    }
}

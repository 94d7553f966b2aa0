//! Store-backed task list
//!
//! The task list is one ordered collection under the `"tasks"` key.
//! Manual and suggestion-accepted tasks are inserted newest-first; tasks
//! created by the inbound poller are appended. There is no per-task
//! locking: mutation is a synchronous get-modify-set against the store,
//! serialized by the event loop.

use std::sync::Arc;

use async_trait::async_trait;
use beacon_domain::{BeaconError, NewTask, Result, Task, TaskPatch};
use tracing::{debug, info};
use uuid::Uuid;

use crate::inbox::ports::TaskSink;
use crate::sessions::ports::SettingsStore;

/// Store key for the task collection.
pub const TASKS_KEY: &str = "tasks";
/// Store key for dismissed suggestion ids.
pub const DISMISSED_SUGGESTIONS_KEY: &str = "dismissed_suggestions";

/// Dismissed-suggestion ids kept before the oldest are dropped.
const DISMISSED_RETENTION: usize = 200;

/// Task list CRUD over the settings store.
pub struct TaskService {
    store: Arc<dyn SettingsStore>,
}

impl TaskService {
    /// Create a task service over the given store.
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// All tasks, in stored order (newest-first for manual inserts).
    pub fn list(&self) -> Result<Vec<Task>> {
        self.read_tasks()
    }

    /// Create a task from user input, inserting it at the front of the
    /// list.
    pub fn create(&self, new: NewTask) -> Result<Task> {
        let task = Task::from_new(new);

        let mut tasks = self.read_tasks()?;
        tasks.insert(0, task.clone());
        self.write_tasks(&tasks)?;

        info!(task_id = %task.id, source = ?task.source, "task created");
        Ok(task)
    }

    /// Append an already-built task (the poller path).
    pub fn append(&self, task: Task) -> Result<Task> {
        let mut tasks = self.read_tasks()?;
        tasks.push(task.clone());
        self.write_tasks(&tasks)?;

        info!(task_id = %task.id, source = ?task.source, "task appended");
        Ok(task)
    }

    /// Merge a partial update into a task, refreshing `updated_at`.
    pub fn update(&self, id: Uuid, patch: TaskPatch) -> Result<Task> {
        let mut tasks = self.read_tasks()?;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| BeaconError::NotFound(format!("task {id} does not exist")))?;

        patch.apply(task);
        let updated = task.clone();
        self.write_tasks(&tasks)?;

        debug!(task_id = %id, "task updated");
        Ok(updated)
    }

    /// Mark a task completed.
    pub fn complete(&self, id: Uuid) -> Result<Task> {
        self.update(id, TaskPatch { completed: Some(true), ..TaskPatch::default() })
    }

    /// Delete a task by id.
    pub fn delete(&self, id: Uuid) -> Result<()> {
        let mut tasks = self.read_tasks()?;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);

        if tasks.len() == before {
            return Err(BeaconError::NotFound(format!("task {id} does not exist")));
        }

        self.write_tasks(&tasks)?;
        info!(task_id = %id, "task deleted");
        Ok(())
    }

    /// Record a dismissed suggestion id, keeping the most recent
    /// [`DISMISSED_RETENTION`] entries.
    pub fn dismiss_suggestion(&self, suggestion_id: &str) -> Result<()> {
        let mut dismissed = self.dismissed_suggestions()?;
        dismissed.retain(|id| id != suggestion_id);
        dismissed.insert(0, suggestion_id.to_string());
        dismissed.truncate(DISMISSED_RETENTION);

        self.store.set(
            DISMISSED_SUGGESTIONS_KEY,
            serde_json::to_value(&dismissed)
                .map_err(|e| BeaconError::Internal(e.to_string()))?,
        )
    }

    /// Ids of suggestions the user has dismissed, newest-first.
    pub fn dismissed_suggestions(&self) -> Result<Vec<String>> {
        match self.store.get(DISMISSED_SUGGESTIONS_KEY)? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| BeaconError::Store(format!("corrupt dismissed list: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    fn read_tasks(&self) -> Result<Vec<Task>> {
        match self.store.get(TASKS_KEY)? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| BeaconError::Store(format!("corrupt task list: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    fn write_tasks(&self, tasks: &[Task]) -> Result<()> {
        self.store.set(
            TASKS_KEY,
            serde_json::to_value(tasks).map_err(|e| BeaconError::Internal(e.to_string()))?,
        )
    }
}

#[async_trait]
impl TaskSink for TaskService {
    async fn create_task(&self, task: Task) -> Result<()> {
        self.append(task)?;
        Ok(())
    }
}

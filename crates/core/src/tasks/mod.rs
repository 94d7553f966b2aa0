//! Local task list management

pub mod service;

pub use service::{TaskService, DISMISSED_SUGGESTIONS_KEY, TASKS_KEY};

//! In-memory task lifecycle storage (spec S4.1 "Task").
//!
//! Grounded on `turbomcp-server`'s `task_storage.rs`: a
//! `Arc<RwLock<HashMap<String, StoredTask>>>` keyed by UUID v4 task id,
//! RFC 3339 timestamps via `chrono`, and an explicit state-transition
//! guard rather than allowing arbitrary status writes. This module is a
//! reusable building block a [`crate::collaborator::ControlPlane`]
//! implementation can embed for `CallToolTask`/`TasksGet`/`TasksList`/
//! `TasksResult`/`TasksCancel`; the core itself never constructs one
//! directly.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::collaborator::{TaskError, TaskHandle, TaskOutcome, TaskPage};
use crate::error::SchedulerError;

/// Lifecycle status of a stored task (spec S4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Accepted, not yet started.
    Submitted,
    /// Actively executing.
    Working,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Cancelled before completion.
    Cancelled,
}

impl TaskStatus {
    /// Wire status token (spec S4.7 `Task.status`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Submitted => "submitted",
            TaskStatus::Working => "working",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// `true` once a task has reached a status it cannot leave.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Whether moving from `self` to `next` is a legal transition (spec
    /// S4.1: a task cannot leave a terminal status, and cannot skip
    /// `Submitted` backward).
    #[must_use]
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (TaskStatus::Submitted, TaskStatus::Working | TaskStatus::Cancelled) => true,
            (
                TaskStatus::Working,
                TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled,
            ) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredTask {
    caller: String,
    status: TaskStatus,
    status_message: String,
    created_at: String,
    last_updated_at: String,
    ttl_ms: i64,
    poll_interval_ms: i64,
    result_json: Option<Vec<u8>>,
    error: Option<TaskError>,
}

impl StoredTask {
    fn to_handle(&self, task_id: &str) -> TaskHandle {
        TaskHandle {
            task_id: task_id.to_string(),
            status: self.status.as_str().to_string(),
            status_message: self.status_message.clone(),
            created_at: self.created_at.clone(),
            last_updated_at: self.last_updated_at.clone(),
            ttl_ms: self.ttl_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }
}

/// Default time-to-live applied when a caller requests `ttl_ms <= 0`
/// (spec S4.1).
pub const DEFAULT_TASK_TTL_MS: i64 = 10 * 60 * 1000;

/// Default suggested poll interval, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: i64 = 1_000;

/// In-memory task table.
#[derive(Debug, Default, Clone)]
pub struct TaskStorage {
    tasks: Arc<RwLock<HashMap<String, StoredTask>>>,
}

impl TaskStorage {
    /// An empty task table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new task owned by `caller`, returning its handle.
    pub async fn create(&self, caller: &str, ttl_ms: i64) -> TaskHandle {
        let task_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let ttl_ms = if ttl_ms > 0 { ttl_ms } else { DEFAULT_TASK_TTL_MS };
        let task = StoredTask {
            caller: caller.to_string(),
            status: TaskStatus::Submitted,
            status_message: String::new(),
            created_at: now.clone(),
            last_updated_at: now,
            ttl_ms,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            result_json: None,
            error: None,
        };
        let handle = task.to_handle(&task_id);
        self.tasks.write().await.insert(task_id, task);
        handle
    }

    /// Fetch a task's handle, scoped to `caller` (spec S4.7 `TasksGet`: a
    /// caller cannot see another caller's tasks).
    pub async fn get(&self, caller: &str, task_id: &str) -> Result<TaskHandle, SchedulerError> {
        let tasks = self.tasks.read().await;
        let task = tasks
            .get(task_id)
            .filter(|t| t.caller == caller)
            .ok_or_else(|| SchedulerError::NotImplemented(format!("task not found: {task_id}")))?;
        Ok(task.to_handle(task_id))
    }

    /// List a caller's tasks, newest-created first, paginated by `cursor`
    /// (an opaque offset) and `limit`.
    pub async fn list(&self, caller: &str, cursor: &str, limit: i32) -> TaskPage {
        let tasks = self.tasks.read().await;
        let mut rows: Vec<_> = tasks
            .iter()
            .filter(|(_, t)| t.caller == caller)
            .map(|(id, t)| t.to_handle(id))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset: usize = cursor.parse().unwrap_or(0);
        let limit = if limit > 0 { limit as usize } else { rows.len() };
        let page: Vec<_> = rows.iter().skip(offset).take(limit).cloned().collect();
        let next_cursor = if offset + page.len() < rows.len() {
            (offset + page.len()).to_string()
        } else {
            String::new()
        };
        TaskPage {
            tasks: page,
            cursor: next_cursor,
        }
    }

    /// Fetch a task's outcome, scoped to `caller`.
    pub async fn result(&self, caller: &str, task_id: &str) -> Result<TaskOutcome, SchedulerError> {
        let tasks = self.tasks.read().await;
        let task = tasks
            .get(task_id)
            .filter(|t| t.caller == caller)
            .ok_or_else(|| SchedulerError::NotImplemented(format!("task not found: {task_id}")))?;
        Ok(TaskOutcome {
            status: task.status.as_str().to_string(),
            result_json: task.result_json.clone(),
            error: task.error.clone(),
        })
    }

    /// Move a task to `Working`.
    pub async fn mark_working(&self, task_id: &str) -> Result<(), SchedulerError> {
        self.transition(task_id, TaskStatus::Working, String::new(), None, None)
            .await
    }

    /// Move a task to `Completed` with a result payload.
    pub async fn complete(&self, task_id: &str, result_json: Vec<u8>) -> Result<(), SchedulerError> {
        self.transition(
            task_id,
            TaskStatus::Completed,
            String::new(),
            Some(result_json),
            None,
        )
        .await
    }

    /// Move a task to `Failed` with an error detail.
    pub async fn fail(&self, task_id: &str, error: TaskError) -> Result<(), SchedulerError> {
        self.transition(task_id, TaskStatus::Failed, String::new(), None, Some(error))
            .await
    }

    /// Cancel a task, scoped to `caller`.
    pub async fn cancel(&self, caller: &str, task_id: &str) -> Result<(), SchedulerError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(task_id)
            .filter(|t| t.caller == caller)
            .ok_or_else(|| SchedulerError::NotImplemented(format!("task not found: {task_id}")))?;
        if !task.status.can_transition_to(TaskStatus::Cancelled) {
            return Err(SchedulerError::NotImplemented(format!(
                "task {task_id} cannot be cancelled from status {}",
                task.status.as_str()
            )));
        }
        task.status = TaskStatus::Cancelled;
        task.last_updated_at = Utc::now().to_rfc3339();
        Ok(())
    }

    async fn transition(
        &self,
        task_id: &str,
        next: TaskStatus,
        status_message: String,
        result_json: Option<Vec<u8>>,
        error: Option<TaskError>,
    ) -> Result<(), SchedulerError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| SchedulerError::NotImplemented(format!("task not found: {task_id}")))?;
        if !task.status.can_transition_to(next) {
            return Err(SchedulerError::NotImplemented(format!(
                "illegal task transition {} -> {}",
                task.status.as_str(),
                next.as_str()
            )));
        }
        task.status = next;
        if !status_message.is_empty() {
            task.status_message = status_message;
        }
        if result_json.is_some() {
            task.result_json = result_json;
        }
        if error.is_some() {
            task.error = error;
        }
        task.last_updated_at = Utc::now().to_rfc3339();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let storage = TaskStorage::new();
        let handle = storage.create("claude-desktop", 0).await;
        assert_eq!(handle.status, "submitted");
        assert_eq!(handle.ttl_ms, DEFAULT_TASK_TTL_MS);

        let fetched = storage.get("claude-desktop", &handle.task_id).await.unwrap();
        assert_eq!(fetched.task_id, handle.task_id);
    }

    #[tokio::test]
    async fn get_scoped_to_caller() {
        let storage = TaskStorage::new();
        let handle = storage.create("alice", 0).await;
        assert!(storage.get("bob", &handle.task_id).await.is_err());
    }

    #[tokio::test]
    async fn custom_ttl_is_respected() {
        let storage = TaskStorage::new();
        let handle = storage.create("alice", 5_000).await;
        assert_eq!(handle.ttl_ms, 5_000);
    }

    #[tokio::test]
    async fn working_then_completed_transition_succeeds() {
        let storage = TaskStorage::new();
        let handle = storage.create("alice", 0).await;
        storage.mark_working(&handle.task_id).await.unwrap();
        storage
            .complete(&handle.task_id, br#"{"ok":true}"#.to_vec())
            .await
            .unwrap();

        let outcome = storage.result("alice", &handle.task_id).await.unwrap();
        assert_eq!(outcome.status, "completed");
        assert_eq!(outcome.result_json.unwrap(), br#"{"ok":true}"#.to_vec());
    }

    #[tokio::test]
    async fn cannot_transition_out_of_terminal_status() {
        let storage = TaskStorage::new();
        let handle = storage.create("alice", 0).await;
        storage.mark_working(&handle.task_id).await.unwrap();
        storage
            .complete(&handle.task_id, br#"{}"#.to_vec())
            .await
            .unwrap();
        assert!(storage.mark_working(&handle.task_id).await.is_err());
    }

    #[tokio::test]
    async fn cancel_from_submitted_succeeds() {
        let storage = TaskStorage::new();
        let handle = storage.create("alice", 0).await;
        storage.cancel("alice", &handle.task_id).await.unwrap();
        let fetched = storage.get("alice", &handle.task_id).await.unwrap();
        assert_eq!(fetched.status, "cancelled");
    }

    #[tokio::test]
    async fn list_paginates_newest_first() {
        let storage = TaskStorage::new();
        for _ in 0..3 {
            storage.create("alice", 0).await;
        }
        let page = storage.list("alice", "", 2).await;
        assert_eq!(page.tasks.len(), 2);
        assert!(!page.cursor.is_empty());

        let second_page = storage.list("alice", &page.cursor, 2).await;
        assert_eq!(second_page.tasks.len(), 1);
        assert!(second_page.cursor.is_empty());
    }
}

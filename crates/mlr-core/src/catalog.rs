//! Task catalog loaded from a JSON array of [`Task`] records.

use std::path::Path;

use tracing::{info, warn};

use crate::domain::{BenchError, Result, Task, TaskCategory};

/// In-memory, read-only task catalog.
#[derive(Debug, Clone, Default)]
pub struct TaskCatalog {
    tasks: Vec<Task>,
}

impl TaskCatalog {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    /// Load `path`. A missing file yields an empty catalog with a warning;
    /// a malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = ?path, "tasks file not found");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let tasks: Vec<Task> = serde_json::from_str(&content)?;
        info!(count = tasks.len(), path = ?path, "loaded tasks");
        Ok(Self { tasks })
    }

    /// Task by id, or `None` when unknown.
    pub fn get_task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    /// Like [`TaskCatalog::get_task`] but with an explicit error.
    pub fn require_task(&self, task_id: &str) -> Result<&Task> {
        self.get_task(task_id)
            .ok_or_else(|| BenchError::TaskNotFound(task_id.to_string()))
    }

    pub fn tasks_by_category(&self, category: TaskCategory) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.category == category).collect()
    }

    /// Tasks whose conference matches, ignoring case.
    pub fn tasks_by_conference(&self, conference: &str) -> Vec<&Task> {
        let wanted = conference.to_lowercase();
        self.tasks
            .iter()
            .filter(|t| {
                t.conference
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase() == wanted)
            })
            .collect()
    }

    pub fn all_tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

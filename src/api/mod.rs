pub mod auth;
pub mod memory;
pub mod rest;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use types::{Batch, Project, Task, TaskRun};

/// Remote task service. The server is the only source of truth for task
/// state; implementations never cache.
///
/// List calls take the scope they are made for so that implementations may
/// narrow the request, but callers must still filter the result themselves.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>>;
    async fn list_batches(&self, project_id: u64) -> Result<Vec<Batch>>;
    async fn list_tasks(&self, project_id: u64, batch_id: Option<u64>) -> Result<Vec<Task>>;
    async fn get_task(&self, id: u64) -> Result<Task>;
    /// Replace a task with `task` (full body). Returns the stored task.
    async fn update_task(&self, task: &Task) -> Result<Task>;
    async fn create_task_run(&self, run: &TaskRun) -> Result<TaskRun>;
}

//! In-process task service used for `--simulate` runs and tests.

use super::types::*;
use super::TaskApi;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Seed data for a simulated service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub batches: Vec<Batch>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Default)]
struct Inner {
    projects: Vec<Project>,
    batches: Vec<Batch>,
    tasks: Vec<Task>,
    runs: Vec<TaskRun>,
    next_run_id: u64,
    fail_reads: bool,
    fail_updates: bool,
    fail_runs: bool,
    task_list_calls: usize,
}

pub struct MemoryApi {
    inner: Mutex<Inner>,
}

impl MemoryApi {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            inner: Mutex::new(Inner {
                projects: fixture.projects,
                batches: fixture.batches,
                tasks: fixture.tasks,
                next_run_id: 1,
                ..Default::default()
            }),
        }
    }

    pub fn from_fixture(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture file: {}", path.display()))?;
        let fixture: Fixture = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse fixture: {}", path.display()))?;
        tracing::info!(
            projects = fixture.projects.len(),
            batches = fixture.batches.len(),
            tasks = fixture.tasks.len(),
            "loaded simulation fixture"
        );
        Ok(Self::new(fixture))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every read request fail as if the network were down.
    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Make task updates fail.
    pub fn fail_updates(&self, fail: bool) {
        self.lock().fail_updates = fail;
    }

    /// Make run creation fail.
    pub fn fail_runs(&self, fail: bool) {
        self.lock().fail_runs = fail;
    }

    pub fn task(&self, id: u64) -> Option<Task> {
        self.lock().tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn runs(&self) -> Vec<TaskRun> {
        self.lock().runs.clone()
    }

    pub fn runs_for(&self, task_id: u64) -> Vec<TaskRun> {
        self.lock()
            .runs
            .iter()
            .filter(|r| r.task_id == task_id)
            .cloned()
            .collect()
    }

    /// Complete a task out-of-band, the way another visitor would.
    pub fn complete_elsewhere(&self, id: u64) {
        if let Some(task) = self.lock().tasks.iter_mut().find(|t| t.id == id) {
            task.state = TaskState::Completed;
        }
    }

    pub fn task_list_calls(&self) -> usize {
        self.lock().task_list_calls
    }
}

#[async_trait]
impl TaskApi for MemoryApi {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let inner = self.lock();
        if inner.fail_reads {
            anyhow::bail!("GET /api/project failed: connection refused");
        }
        Ok(inner.projects.clone())
    }

    // Scope is ignored on purpose: the whole collection comes back, as it
    // does from a server without filter support.
    async fn list_batches(&self, _project_id: u64) -> Result<Vec<Batch>> {
        let inner = self.lock();
        if inner.fail_reads {
            anyhow::bail!("GET /api/batch failed: connection refused");
        }
        Ok(inner.batches.clone())
    }

    async fn list_tasks(&self, _project_id: u64, _batch_id: Option<u64>) -> Result<Vec<Task>> {
        let mut inner = self.lock();
        inner.task_list_calls += 1;
        if inner.fail_reads {
            anyhow::bail!("GET /api/task failed: connection refused");
        }
        Ok(inner.tasks.clone())
    }

    async fn get_task(&self, id: u64) -> Result<Task> {
        let inner = self.lock();
        if inner.fail_reads {
            anyhow::bail!("GET /api/task/{} failed: connection refused", id);
        }
        inner
            .tasks
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("GET /api/task/{} failed (404 Not Found)", id))
    }

    async fn update_task(&self, task: &Task) -> Result<Task> {
        let mut inner = self.lock();
        if inner.fail_updates {
            anyhow::bail!("PUT /api/task/{} failed: connection refused", task.id);
        }
        let Some(stored) = inner.tasks.iter_mut().find(|t| t.id == task.id) else {
            anyhow::bail!("PUT /api/task/{} failed (404 Not Found)", task.id);
        };
        if stored.state == TaskState::Completed && task.state == TaskState::Available {
            anyhow::bail!(
                "PUT /api/task/{} failed (400 Bad Request): completed tasks cannot be reopened",
                task.id
            );
        }
        *stored = task.clone();
        Ok(stored.clone())
    }

    async fn create_task_run(&self, run: &TaskRun) -> Result<TaskRun> {
        let mut inner = self.lock();
        if inner.fail_runs {
            anyhow::bail!("POST /api/taskrun failed: connection refused");
        }
        if !inner.tasks.iter().any(|t| t.id == run.task_id) {
            anyhow::bail!("POST /api/taskrun failed (400 Bad Request): unknown task {}", run.task_id);
        }
        let mut stored = run.clone();
        stored.id = Some(inner.next_run_id);
        inner.next_run_id += 1;
        inner.runs.push(stored.clone());
        Ok(stored)
    }
}

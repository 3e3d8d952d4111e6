//! Two-phase answer submission.
//!
//! Completing a task takes two independent writes: the state transition
//! (`PUT /api/task/{id}`) and the run record (`POST /api/taskrun`). They are
//! issued in that order and nothing spans them, so a failure between the two
//! leaves the task completed with no run. That outcome is reported as
//! [`SubmitOutcome::RunFailed`]; no rollback is attempted.

use crate::api::types::{Task, TaskRun};
use crate::api::TaskApi;
use anyhow::{Context, Result};

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Both writes acknowledged.
    Completed { task: Task, run: TaskRun },
    /// Someone else completed the task first. Nothing was written.
    AlreadyCompleted { task_id: u64 },
    /// The transition was not acknowledged. No run was created.
    TransitionFailed { task_id: u64, error: anyhow::Error },
    /// The task is now completed but its run could not be created.
    RunFailed { task: Task, error: anyhow::Error },
}

impl SubmitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmitOutcome::Completed { .. })
    }
}

/// Complete `shown` with `answer`.
pub async fn submit_answer(api: &dyn TaskApi, shown: &Task, answer: &str) -> SubmitOutcome {
    // Re-read so the PUT carries the server's current copy of every field.
    let current = match api
        .get_task(shown.id)
        .await
        .with_context(|| format!("could not re-read task {} before submitting", shown.id))
    {
        Ok(task) => task,
        Err(error) => {
            return SubmitOutcome::TransitionFailed {
                task_id: shown.id,
                error,
            }
        }
    };

    if !current.is_available() {
        tracing::warn!(task_id = shown.id, "task already completed, skipping submission");
        return SubmitOutcome::AlreadyCompleted { task_id: shown.id };
    }

    let completed = match api.update_task(&current.completed()).await {
        Ok(task) => task,
        Err(error) => {
            tracing::error!(task_id = shown.id, error = %format!("{:#}", error), "state transition failed");
            return SubmitOutcome::TransitionFailed {
                task_id: shown.id,
                error,
            };
        }
    };
    tracing::info!(task_id = completed.id, "task marked completed");

    match record_run(api, &completed, answer).await {
        Ok(run) => SubmitOutcome::Completed {
            task: completed,
            run,
        },
        Err(error) => SubmitOutcome::RunFailed {
            task: completed,
            error,
        },
    }
}

/// Create the run for an already-completed task.
pub async fn record_run(api: &dyn TaskApi, task: &Task, answer: &str) -> Result<TaskRun> {
    let run = TaskRun::for_task(task, answer);
    match api.create_task_run(&run).await {
        Ok(stored) => {
            tracing::info!(task_id = task.id, run_id = ?stored.id, answer, "run recorded");
            Ok(stored)
        }
        Err(e) => {
            tracing::error!(
                task_id = task.id,
                error = %format!("{:#}", e),
                "run creation failed; task is completed without a run"
            );
            Err(e)
        }
    }
}

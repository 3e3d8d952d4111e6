use crate::api::types::{Project, Task};

/// Batch scope of the current visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchChoice {
    /// Not looked at yet.
    #[default]
    Undecided,
    /// Batching disabled, or the project has no batches.
    Unbatched,
    Batch(u64),
}

impl BatchChoice {
    pub fn batch_id(self) -> Option<u64> {
        match self {
            BatchChoice::Batch(id) => Some(id),
            BatchChoice::Undecided | BatchChoice::Unbatched => None,
        }
    }
}

/// Submission progress of the task on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Rendered, waiting for an answer.
    Shown,
    Submitting,
    /// Transition and run both acknowledged. Terminal.
    Completed,
    /// A request failed; the task stays on screen for a manual retry.
    SubmitFailed,
}

#[derive(Debug, Clone)]
pub struct ShownTask {
    pub task: Task,
    pub phase: Phase,
    /// The server already accepted the state transition; only the run is
    /// still missing.
    pub transitioned: bool,
}

/// Per-visitor state threaded through every step of the cycle. Nothing here
/// is persisted; the server owns task state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub project: Option<Project>,
    pub batch: BatchChoice,
    pub previous_task_id: Option<u64>,
    pub current: Option<ShownTask>,
}

impl Session {
    /// Put `task` on screen. Its id becomes the one to avoid next time.
    pub fn show(&mut self, task: Task) {
        self.previous_task_id = Some(task.id);
        self.current = Some(ShownTask {
            task,
            phase: Phase::Shown,
            transitioned: false,
        });
    }

    /// Drop whatever is on screen (nothing left to do).
    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.current.as_ref().map(|s| &s.task)
    }

    /// True when `task_id` is the task on screen and it still takes an answer.
    pub fn answerable(&self, task_id: u64) -> bool {
        self.current.as_ref().is_some_and(|s| {
            s.task.id == task_id && matches!(s.phase, Phase::Shown | Phase::SubmitFailed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{TaskInfo, TaskState};

    fn task(id: u64) -> Task {
        Task {
            id,
            project_id: 1,
            batch_id: None,
            state: TaskState::Available,
            info: TaskInfo::default(),
            extra: Default::default(),
        }
    }

    #[test]
    fn test_show_records_previous_id() {
        let mut session = Session::default();
        assert_eq!(session.previous_task_id, None);

        session.show(task(4));
        session.show(task(7));
        assert_eq!(session.previous_task_id, Some(7));
        assert_eq!(session.current_task().map(|t| t.id), Some(7));
        assert_eq!(session.current.as_ref().unwrap().phase, Phase::Shown);

        session.clear();
        assert!(session.current.is_none());
        assert_eq!(session.previous_task_id, Some(7));
    }

    #[test]
    fn test_answerable_only_for_task_on_screen() {
        let mut session = Session::default();
        assert!(!session.answerable(4));

        session.show(task(4));
        assert!(session.answerable(4));
        assert!(!session.answerable(5));

        for (phase, expected) in [
            (Phase::Submitting, false),
            (Phase::Completed, false),
            (Phase::SubmitFailed, true),
        ] {
            session.current.as_mut().unwrap().phase = phase;
            assert_eq!(session.answerable(4), expected, "{:?}", phase);
        }

        session.clear();
        assert!(!session.answerable(4));
    }
}

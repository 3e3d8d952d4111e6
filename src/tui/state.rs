use crate::api::types::Task;
use crate::engine::Phase;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const MAX_LOGS: usize = 200;

/// What the main panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Loading,
    Task,
    /// Nothing left to do in this project (or batch).
    Finished,
    /// The configured project does not exist.
    NoProject,
    /// A request failed before any task could be shown.
    Error,
}

#[derive(Debug, Clone)]
pub struct TaskView {
    pub id: u64,
    pub batch_id: Option<u64>,
    pub url: String,
    pub link: String,
    pub phase: Phase,
}

impl TaskView {
    pub fn new(task: &Task, phase: Phase) -> Self {
        Self {
            id: task.id,
            batch_id: task.batch_id,
            url: task.info.url.clone(),
            link: task.info.link.clone(),
            phase,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub message: String,
}

/// Read-only snapshot the presenter publishes for the TUI.
#[derive(Debug, Clone)]
pub struct AppState {
    pub project: String,
    pub description: Option<String>,
    pub simulate: bool,
    pub view: View,
    pub task: Option<TaskView>,
    pub answers: Vec<String>,
    pub last_error: Option<String>,
    pub success_until: Option<Instant>,
    pub completed_count: u32,
    pub failed_count: u32,
    pub start_time: Instant,
    pub logs: VecDeque<LogEntry>,
}

impl AppState {
    pub fn new(project: &str, answers: Vec<String>, simulate: bool) -> Self {
        Self {
            project: project.to_string(),
            description: None,
            simulate,
            view: View::Loading,
            task: None,
            answers,
            last_error: None,
            success_until: None,
            completed_count: 0,
            failed_count: 0,
            start_time: Instant::now(),
            logs: VecDeque::with_capacity(MAX_LOGS),
        }
    }

    pub fn push_log(&mut self, level: &str, message: String) {
        let time = chrono::Local::now().format("%H:%M:%S%.3f").to_string();
        if self.logs.len() >= MAX_LOGS {
            self.logs.pop_front();
        }
        self.logs.push_back(LogEntry {
            time,
            level: level.to_string(),
            message,
        });
    }

    pub fn flash_success(&mut self, for_how_long: Duration) {
        self.success_until = Some(Instant::now() + for_how_long);
    }

    pub fn showing_success(&self) -> bool {
        self.success_until.is_some_and(|t| Instant::now() < t)
    }

    pub fn uptime(&self) -> String {
        let secs = self.start_time.elapsed().as_secs();
        let h = secs / 3600;
        let m = (secs % 3600) / 60;
        format!("{}h {:02}m", h, m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_ring_is_bounded() {
        let mut state = AppState::new("p", vec!["Yes".to_string()], false);
        for i in 0..(MAX_LOGS + 25) {
            state.push_log("INFO", format!("line {}", i));
        }
        assert_eq!(state.logs.len(), MAX_LOGS);
        assert_eq!(state.logs.front().unwrap().message, "line 25");
    }

    #[test]
    fn test_success_flash_expires() {
        let mut state = AppState::new("p", vec![], false);
        assert!(!state.showing_success());
        state.flash_success(Duration::from_secs(60));
        assert!(state.showing_success());
        state.flash_success(Duration::ZERO);
        assert!(!state.showing_success());
    }
}

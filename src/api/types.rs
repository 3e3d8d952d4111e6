use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A crowdsourcing project as listed by `/api/project`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    #[serde(alias = "shortName")]
    pub short_name: String,
    #[serde(default)]
    pub description: String,
}

/// Optional partition of a project's tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: u64,
    #[serde(alias = "app_id", alias = "projectId")]
    pub project_id: u64,
}

/// Lifecycle state of a task. Only ever moves `Available -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Available,
    Completed,
}

impl TaskState {
    pub fn as_wire(self) -> &'static str {
        match self {
            TaskState::Available => "ongoing",
            TaskState::Completed => "completed",
        }
    }
}

impl Serialize for TaskState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

// Older servers sent 0/1 (sometimes quoted) instead of the state names.
impl<'de> Deserialize<'de> for TaskState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        match &raw {
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "ongoing" | "available" | "0" => Ok(TaskState::Available),
                "completed" | "1" => Ok(TaskState::Completed),
                other => Err(D::Error::custom(format!("unknown task state: {other:?}"))),
            },
            Value::Number(n) => match n.as_u64() {
                Some(0) => Ok(TaskState::Available),
                Some(1) => Ok(TaskState::Completed),
                _ => Err(D::Error::custom(format!("unknown task state: {n}"))),
            },
            other => Err(D::Error::custom(format!("invalid task state: {other}"))),
        }
    }
}

/// Presentation payload of a task: the media to show and where it lives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub link: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One unit of work.
///
/// Fields the presenter does not use are kept in `extra` so that an update
/// sends back the task exactly as the server described it, apart from the
/// fields we changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    #[serde(alias = "app_id", alias = "projectId")]
    pub project_id: u64,
    #[serde(default, alias = "batchId", skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<u64>,
    pub state: TaskState,
    #[serde(default)]
    pub info: TaskInfo,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    pub fn is_available(&self) -> bool {
        self.state == TaskState::Available
    }

    /// Copy of this task with the state moved to `Completed`.
    pub fn completed(&self) -> Task {
        Task {
            state: TaskState::Completed,
            ..self.clone()
        }
    }
}

/// Answer payload stored on a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub answer: String,
}

/// Immutable record of one visitor's answer to one task (`/api/taskrun`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRun {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub created: String,
    #[serde(alias = "app_id", alias = "projectId")]
    pub project_id: u64,
    #[serde(alias = "taskId")]
    pub task_id: u64,
    pub info: RunInfo,
}

impl TaskRun {
    /// New run for `task`, stamped with the current time.
    pub fn for_task(task: &Task, answer: &str) -> Self {
        Self {
            id: None,
            created: chrono::Utc::now().to_rfc3339(),
            project_id: task.project_id,
            task_id: task.id,
            info: RunInfo {
                answer: answer.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_state_encodings() {
        let tasks: Vec<Task> = serde_json::from_str(
            r#"[
                {"id": 1, "app_id": 7, "state": "0", "info": {"url": "u", "link": "l"}},
                {"id": 2, "app_id": 7, "state": 1, "info": {"url": "u", "link": "l"}},
                {"id": 3, "project_id": 7, "state": "ongoing", "info": {}},
                {"id": 4, "projectId": 7, "batchId": 3, "state": "completed"}
            ]"#,
        )
        .unwrap();

        let states: Vec<TaskState> = tasks.iter().map(|t| t.state).collect();
        assert_eq!(
            states,
            vec![
                TaskState::Available,
                TaskState::Completed,
                TaskState::Available,
                TaskState::Completed
            ]
        );
        assert!(tasks.iter().all(|t| t.project_id == 7));
        assert_eq!(tasks[3].batch_id, Some(3));
    }

    #[test]
    fn test_unknown_state_rejected() {
        let err = serde_json::from_str::<Task>(r#"{"id": 1, "project_id": 1, "state": "paused"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("paused"));
    }

    #[test]
    fn test_completed_copy_keeps_unmodelled_fields() {
        let task: Task = serde_json::from_str(
            r#"{"id": 9, "project_id": 2, "state": "ongoing", "quorum": 0,
                "n_answers": 30, "created": "2012-01-01T00:00:00",
                "info": {"url": "http://img", "link": "http://page", "caption": "cat"}}"#,
        )
        .unwrap();

        let body = serde_json::to_value(task.completed()).unwrap();
        assert_eq!(body["state"], "completed");
        assert_eq!(body["n_answers"], 30);
        assert_eq!(body["created"], "2012-01-01T00:00:00");
        assert_eq!(body["info"]["caption"], "cat");
        assert_eq!(body["info"]["url"], "http://img");
        assert!(body.get("batch_id").is_none());
    }

    #[test]
    fn test_run_body_shape() {
        let task: Task =
            serde_json::from_str(r#"{"id": 5, "project_id": 3, "state": "ongoing"}"#).unwrap();
        let body = serde_json::to_value(TaskRun::for_task(&task, "Yes")).unwrap();
        assert_eq!(body["task_id"], 5);
        assert_eq!(body["project_id"], 3);
        assert_eq!(body["info"]["answer"], "Yes");
        assert!(body.get("id").is_none());
        assert!(chrono::DateTime::parse_from_rfc3339(body["created"].as_str().unwrap()).is_ok());
    }
}

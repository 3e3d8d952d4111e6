use crate::api::types::{Batch, Task};
use crate::api::TaskApi;
use anyhow::Result;
use rand::Rng;

/// Which tasks the current visit may show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub project_id: u64,
    pub batch_id: Option<u64>,
}

impl Scope {
    /// True for available tasks of this project (and batch, when scoped).
    pub fn admits(&self, task: &Task) -> bool {
        task.is_available()
            && task.project_id == self.project_id
            && self.batch_id.map_or(true, |b| task.batch_id == Some(b))
    }
}

/// Pick one of the project's batches uniformly at random.
/// `None` when the project has no batches.
pub async fn choose_batch<R: Rng>(
    api: &dyn TaskApi,
    project_id: u64,
    rng: &mut R,
) -> Result<Option<u64>> {
    let batches: Vec<Batch> = api
        .list_batches(project_id)
        .await?
        .into_iter()
        .filter(|b| b.project_id == project_id)
        .collect();
    if batches.is_empty() {
        return Ok(None);
    }
    let batch = &batches[rng.gen_range(0..batches.len())];
    tracing::debug!(project_id, batch_id = batch.id, of = batches.len(), "batch chosen");
    Ok(Some(batch.id))
}

/// Fetch the task collection and keep the tasks `scope` admits.
pub async fn fetch_candidates(api: &dyn TaskApi, scope: &Scope) -> Result<Vec<Task>> {
    let tasks = api.list_tasks(scope.project_id, scope.batch_id).await?;
    let fetched = tasks.len();
    let eligible: Vec<Task> = tasks.into_iter().filter(|t| scope.admits(t)).collect();
    tracing::debug!(
        project_id = scope.project_id,
        batch_id = ?scope.batch_id,
        fetched,
        eligible = eligible.len(),
        "candidate tasks"
    );
    Ok(eligible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::{Fixture, MemoryApi};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn api() -> MemoryApi {
        let fixture: Fixture = serde_json::from_str(
            r#"{
                "batches": [
                    {"id": 1, "project_id": 1},
                    {"id": 2, "project_id": 1},
                    {"id": 3, "project_id": 2}
                ],
                "tasks": [
                    {"id": 10, "project_id": 1, "batch_id": 1, "state": "ongoing"},
                    {"id": 11, "project_id": 1, "batch_id": 1, "state": "completed"},
                    {"id": 12, "project_id": 1, "batch_id": 2, "state": "ongoing"},
                    {"id": 13, "project_id": 2, "batch_id": 3, "state": "ongoing"},
                    {"id": 14, "project_id": 1, "state": 0}
                ]
            }"#,
        )
        .unwrap();
        MemoryApi::new(fixture)
    }

    fn ids(tasks: &[Task]) -> Vec<u64> {
        tasks.iter().map(|t| t.id).collect()
    }

    #[tokio::test]
    async fn test_filters_project_and_state() {
        let api = api();
        let scope = Scope { project_id: 1, batch_id: None };
        let eligible = fetch_candidates(&api, &scope).await.unwrap();
        assert_eq!(ids(&eligible), vec![10, 12, 14]);
    }

    #[tokio::test]
    async fn test_filters_batch() {
        let api = api();
        let scope = Scope { project_id: 1, batch_id: Some(1) };
        let eligible = fetch_candidates(&api, &scope).await.unwrap();
        assert_eq!(ids(&eligible), vec![10]);
    }

    #[tokio::test]
    async fn test_choose_batch_stays_in_project() {
        let api = api();
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = HashSet::new();
        for _ in 0..50 {
            let batch = choose_batch(&api, 1, &mut rng).await.unwrap().unwrap();
            seen.insert(batch);
        }
        assert_eq!(seen, HashSet::from([1, 2]));
    }

    #[tokio::test]
    async fn test_choose_batch_none_without_batches() {
        let api = api();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(choose_batch(&api, 99, &mut rng).await.unwrap(), None);
    }
}

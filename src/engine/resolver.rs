use crate::api::types::Project;
use crate::api::TaskApi;
use anyhow::Result;

/// Look up the project with this exact short name.
///
/// `None` means no such project: the caller has no work to show and must not
/// go on to fetch tasks.
pub async fn resolve_project(api: &dyn TaskApi, short_name: &str) -> Result<Option<Project>> {
    let projects = api.list_projects().await?;
    let scanned = projects.len();
    let found = find_project(projects, short_name);
    match &found {
        Some(p) => tracing::info!(short_name, project_id = p.id, "project resolved"),
        None => tracing::warn!(short_name, scanned, "no project with this short name"),
    }
    Ok(found)
}

/// First project whose short name matches exactly.
pub fn find_project(projects: Vec<Project>, short_name: &str) -> Option<Project> {
    projects.into_iter().find(|p| p.short_name == short_name)
}

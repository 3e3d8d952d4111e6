use super::auth::CsrfToken;
use super::types::*;
use super::TaskApi;
use crate::config::ServerConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// The server refuses pages larger than this.
const MAX_PAGE_LIMIT: u32 = 100;

pub struct ApiClient {
    client: Client,
    csrf: Option<CsrfToken>,
    base_url: String,
    project_collection: String,
    page_limit: u32,
    server_side_filters: bool,
}

impl ApiClient {
    pub fn new(config: &ServerConfig, csrf: Option<CsrfToken>) -> Result<Self> {
        let mut builder = Client::builder().pool_max_idle_per_host(4);
        if let Some(ms) = config.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let client = builder.build().context("failed to build HTTP client")?;
        Ok(Self {
            client,
            csrf,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            project_collection: config.project_collection.clone(),
            page_limit: config.page_limit.clamp(1, MAX_PAGE_LIMIT),
            server_side_filters: config.server_side_filters,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    /// Fetch a whole collection, following `limit`/`offset` pages until the
    /// server returns a short one. `filters` are only sent when server-side
    /// filtering is enabled.
    ///
    /// Paging also stops when a page is larger than requested (the server
    /// ignored `limit`) or starts with the same item as the previous page (the
    /// server ignored `offset`).
    async fn list_all<T: DeserializeOwned>(
        &self,
        collection: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut all: Vec<Value> = Vec::new();
        let mut offset: u64 = 0;
        let mut previous_first: Option<Value> = None;
        let limit = self.page_limit as usize;

        loop {
            let mut query: Vec<(&str, String)> = vec![
                ("limit", self.page_limit.to_string()),
                ("offset", offset.to_string()),
            ];
            if self.server_side_filters {
                query.extend(filters.iter().cloned());
            }

            let resp = self
                .client
                .get(self.url(collection))
                .query(&query)
                .send()
                .await
                .with_context(|| format!("GET /api/{} failed", collection))?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                anyhow::bail!("GET /api/{} failed ({}): {}", collection, status, body);
            }

            let page: Vec<Value> = resp
                .json()
                .await
                .with_context(|| format!("failed to parse /api/{} response", collection))?;
            let count = page.len();
            if previous_first.is_some() && page.first() == previous_first.as_ref() {
                tracing::warn!(collection, offset, "server repeated a page; offset ignored, stopping");
                break;
            }
            previous_first = page.first().cloned();
            all.extend(page);
            if count > limit {
                tracing::warn!(collection, count, limit, "server ignored page limit, stopping");
                break;
            }
            if count < limit {
                break;
            }
            offset += count as u64;
        }

        tracing::debug!(collection, count = all.len(), "fetched collection");
        serde_json::from_value(Value::Array(all))
            .with_context(|| format!("failed to parse /api/{} response", collection))
    }

    /// Write request carrying the anti-forgery token.
    async fn send_write<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let mut req = self.client.request(method.clone(), self.url(path)).json(body);
        if let Some(csrf) = &self.csrf {
            for (k, v) in csrf.headers(&method) {
                req = req.header(k, v);
            }
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("{} /api/{} failed", method, path))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("{} /api/{} failed ({}): {}", method, path, status, body);
        }
        resp.json()
            .await
            .with_context(|| format!("failed to parse {} /api/{} response", method, path))
    }
}

#[async_trait]
impl TaskApi for ApiClient {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.list_all(&self.project_collection, &[]).await
    }

    async fn list_batches(&self, project_id: u64) -> Result<Vec<Batch>> {
        self.list_all("batch", &[("project_id", project_id.to_string())])
            .await
    }

    async fn list_tasks(&self, project_id: u64, batch_id: Option<u64>) -> Result<Vec<Task>> {
        let mut filters = vec![("project_id", project_id.to_string())];
        if let Some(batch_id) = batch_id {
            filters.push(("batch_id", batch_id.to_string()));
        }
        self.list_all("task", &filters).await
    }

    async fn get_task(&self, id: u64) -> Result<Task> {
        let path = format!("task/{}", id);
        let resp = self
            .client
            .get(self.url(&path))
            .send()
            .await
            .with_context(|| format!("GET /api/{} failed", path))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("GET /api/{} failed ({}): {}", path, status, body);
        }
        resp.json()
            .await
            .with_context(|| format!("failed to parse /api/{} response", path))
    }

    async fn update_task(&self, task: &Task) -> Result<Task> {
        let path = format!("task/{}", task.id);
        self.send_write(Method::PUT, &path, task).await
    }

    async fn create_task_run(&self, run: &TaskRun) -> Result<TaskRun> {
        self.send_write(Method::POST, "taskrun", run).await
    }
}

//! HTTP client for the task API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::TaskApi;
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::task::{NewTask, Project, Task, TaskPatch};

const TASKS_PATH: &str = "tasks";
const PROJECTS_PATH: &str = "projects";
const MAX_ERROR_BODY: usize = 512;

/// REST implementation of [`TaskApi`].
#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpTaskApi {
    /// Creates a client from the `[api]` config section.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be constructed.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim()).map_err(|err| {
            Error::InvalidConfig(format!("api.base_url '{}': {err}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "api.base_url '{}' cannot be used as a base URL",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| Error::Transport(format!("failed to create HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url,
            token: config.token.clone().filter(|token| !token.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join path segments onto the base URL, percent-encoding each segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidConfig("api.base_url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder, subject: &str) -> Result<Response> {
        let response = self.authorize(req).send().await.map_err(|err| {
            tracing::debug!(subject, error = %err, "task API request failed");
            Error::Transport(err.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status, &body, subject))
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        response
            .json::<T>()
            .await
            .map_err(|err| Error::Decode(err.to_string()))
    }
}

/// Map a non-success HTTP status to the client error taxonomy.
pub fn classify_failure(status: StatusCode, body: &str, subject: &str) -> Error {
    if status == StatusCode::NOT_FOUND {
        return Error::NotFound(subject.to_string());
    }
    let mut message = body.trim().to_string();
    if message.is_empty() {
        message = status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
    }
    if message.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
        message.push_str("...");
    }
    Error::Rejected {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn list_tasks(&self) -> Result<Vec<Task>> {
        let url = self.endpoint(&[TASKS_PATH])?;
        tracing::debug!(%url, "listing tasks");
        let response = self.send(self.client.get(url), TASKS_PATH).await?;
        Self::read_json(response).await
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let url = self.endpoint(&[PROJECTS_PATH])?;
        tracing::debug!(%url, "listing projects");
        let response = self.send(self.client.get(url), PROJECTS_PATH).await?;
        Self::read_json(response).await
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task> {
        let url = self.endpoint(&[TASKS_PATH])?;
        tracing::debug!(%url, id = %task.id, "creating task");
        let response = self.send(self.client.post(url).json(task), &task.id).await?;
        Self::read_json(response).await
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Task> {
        let url = self.endpoint(&[TASKS_PATH, id])?;
        tracing::debug!(%url, id, "updating task");
        let response = self.send(self.client.patch(url).json(patch), id).await?;
        Self::read_json(response).await
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&[TASKS_PATH, id])?;
        tracing::debug!(%url, id, "deleting task");
        self.send(self.client.delete(url), id).await?;
        Ok(())
    }
}

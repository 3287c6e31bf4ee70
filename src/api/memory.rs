//! In-memory task API for tests and local demos.
//!
//! Behaves like the REST service: ids are unique, unknown ids are
//! `NotFound`, blank titles are rejected. Failures can be injected per call,
//! and list responses can be held back to simulate slow fetches.
//!
//! Not suitable for production: nothing is persisted.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::TaskApi;
use crate::error::{Error, Result};
use crate::task::{NewTask, Project, Task, TaskPatch};

/// Calls observed by the in-memory API, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    ListTasks,
    ListProjects,
    Create(String),
    Update(String),
    Delete(String),
}

#[derive(Debug, Default)]
struct State {
    tasks: Vec<Task>,
    projects: Vec<Project>,
    failures: VecDeque<Error>,
    list_failures: VecDeque<Error>,
    list_gates: VecDeque<oneshot::Receiver<()>>,
    calls: Vec<ApiCall>,
}

#[derive(Debug, Default)]
pub struct InMemoryTaskApi {
    state: Mutex<State>,
}

impl InMemoryTaskApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let api = Self::new();
        api.lock().tasks = tasks;
        api
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a record directly, bypassing validation.
    pub fn seed(&self, task: Task) {
        self.lock().tasks.push(task);
    }

    pub fn set_projects(&self, projects: Vec<Project>) {
        self.lock().projects = projects;
    }

    /// Make the next call (of any kind) fail with `err`.
    pub fn fail_next(&self, err: Error) {
        self.lock().failures.push_back(err);
    }

    /// Make the next `list_tasks` call fail with `err`, leaving other calls
    /// alone.
    pub fn fail_next_list(&self, err: Error) {
        self.lock().list_failures.push_back(err);
    }

    /// Hold the next `list_tasks` response until the returned sender fires
    /// or is dropped. The list is captured when the call starts.
    pub fn hold_next_list(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.lock().list_gates.push_back(rx);
        tx
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    /// Record `call` and pop any injected failure for it.
    fn begin(&self, call: ApiCall) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn snapshot_with_gate(&self) -> (Vec<Task>, Option<oneshot::Receiver<()>>) {
        let mut state = self.lock();
        let gate = state.list_gates.pop_front();
        (state.tasks.clone(), gate)
    }
}

#[async_trait]
impl TaskApi for InMemoryTaskApi {
    async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.begin(ApiCall::ListTasks)?;
        let injected = self.lock().list_failures.pop_front();
        if let Some(err) = injected {
            return Err(err);
        }
        let (tasks, gate) = self.snapshot_with_gate();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(tasks)
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.begin(ApiCall::ListProjects)?;
        Ok(self.lock().projects.clone())
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task> {
        self.begin(ApiCall::Create(task.id.clone()))?;
        if task.title.trim().is_empty() {
            return Err(Error::Rejected {
                status: 422,
                message: "title must not be empty".to_string(),
            });
        }
        let mut state = self.lock();
        if state.tasks.iter().any(|existing| existing.id == task.id) {
            return Err(Error::Rejected {
                status: 409,
                message: format!("task {} already exists", task.id),
            });
        }
        let created = task.clone().into_task();
        state.tasks.push(created.clone());
        Ok(created)
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Task> {
        self.begin(ApiCall::Update(id.to_string()))?;
        if matches!(&patch.title, Some(title) if title.trim().is_empty()) {
            return Err(Error::Rejected {
                status: 422,
                message: "title must not be empty".to_string(),
            });
        }
        let mut state = self.lock();
        let task = state
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        patch.apply_to(task);
        Ok(task.clone())
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        self.begin(ApiCall::Delete(id.to_string()))?;
        let mut state = self.lock();
        let before = state.tasks.len();
        state.tasks.retain(|task| task.id != id);
        if state.tasks.len() == before {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}

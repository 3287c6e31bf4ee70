//! Mutation coordination against the task API.
//!
//! The coordinator owns the [`TaskStore`] and the [`Selection`]. Writes go to
//! the API first; local state only changes through the refetch that follows a
//! confirmed write, so a failed mutation leaves the snapshot exactly as it
//! was. No lock is held across an API call.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::broadcast;

use crate::aggregate::{self, GroupSummary, StatusCounts};
use crate::api::TaskApi;
use crate::error::{Error, Result};
use crate::events::{Notification, Operation};
use crate::selection::Selection;
use crate::store::{ApplyOutcome, TaskStore};
use crate::task::{NewTask, Project, Task, TaskPatch};
use crate::tree::Forest;

const NOTIFICATION_CAPACITY: usize = 64;

/// What happened to the snapshot after a confirmed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "refresh", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Applied { generation: u64, tasks: usize },
    /// A newer list-fetch was issued meanwhile; its result wins.
    Superseded { generation: u64, latest: u64 },
    /// The mutation was confirmed but the list could not be fetched.
    Failed { message: String },
}

impl From<ApplyOutcome> for RefreshOutcome {
    fn from(outcome: ApplyOutcome) -> Self {
        match outcome {
            ApplyOutcome::Applied { generation, tasks } => {
                RefreshOutcome::Applied { generation, tasks }
            }
            ApplyOutcome::Superseded { generation, latest } => {
                RefreshOutcome::Superseded { generation, latest }
            }
        }
    }
}

/// Successful mutation report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    pub operation: Operation,
    pub task_id: String,
    /// Record returned by the API for create/update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
    #[serde(flatten)]
    pub refresh: RefreshOutcome,
}

pub struct MutationCoordinator {
    api: Arc<dyn TaskApi>,
    store: Mutex<TaskStore>,
    selection: Mutex<Selection>,
    notifications: broadcast::Sender<Notification>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MutationCoordinator {
    pub fn new(api: Arc<dyn TaskApi>) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            api,
            store: Mutex::new(TaskStore::new()),
            selection: Mutex::new(Selection::new()),
            notifications,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    fn notify(&self, notification: Notification) {
        // No subscribers is fine.
        let _ = self.notifications.send(notification);
    }

    fn report_failure(&self, operation: Operation, task_id: Option<&str>, err: &Error) {
        tracing::debug!(
            operation = operation.as_str(),
            task_id,
            error = %err,
            "task mutation failed"
        );
        self.notify(Notification::MutationFailed {
            operation,
            task_id: task_id.map(str::to_string),
            message: err.to_string(),
        });
    }

    // ------------------------------------------------------------------
    // Snapshot refresh
    // ------------------------------------------------------------------

    /// Fetch the task list and apply it if no newer fetch was issued since.
    pub async fn refresh(&self) -> Result<ApplyOutcome> {
        let ticket = lock(&self.store).begin_fetch();
        tracing::debug!(generation = ticket.generation(), "fetching task list");

        let tasks = match self.api.list_tasks().await {
            Ok(tasks) => tasks,
            Err(err) => {
                self.report_failure(Operation::Refresh, None, &err);
                return Err(err);
            }
        };

        let (outcome, roots) = {
            let mut store = lock(&self.store);
            let outcome = store.apply(ticket, tasks);
            (outcome, store.forest().len())
        };
        if let ApplyOutcome::Applied { generation, tasks } = outcome {
            self.notify(Notification::TreeChanged {
                generation,
                tasks,
                roots,
            });
        }
        Ok(outcome)
    }

    /// Fetch the project list used to name summary groups.
    pub async fn refresh_projects(&self) -> Result<usize> {
        let projects = self.api.list_projects().await?;
        let count = projects.len();
        lock(&self.store).set_projects(projects);
        Ok(count)
    }

    /// Refetch after a confirmed write. Failure here does not undo the write.
    async fn refresh_after(&self, operation: Operation, task_id: &str) -> RefreshOutcome {
        match self.refresh().await {
            Ok(outcome) => outcome.into(),
            Err(err) => {
                tracing::warn!(
                    operation = operation.as_str(),
                    task_id,
                    error = %err,
                    "mutation confirmed but task list refresh failed"
                );
                RefreshOutcome::Failed {
                    message: err.to_string(),
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Create a task. Only the id and title are checked locally; the API
    /// decides uniqueness.
    pub async fn create(&self, payload: NewTask) -> Result<MutationOutcome> {
        if let Err(err) = payload.validate() {
            self.report_failure(Operation::Create, Some(&payload.id), &err);
            return Err(err);
        }

        let created = match self.api.create_task(&payload).await {
            Ok(task) => task,
            Err(err) => {
                self.report_failure(Operation::Create, Some(&payload.id), &err);
                return Err(err);
            }
        };
        tracing::info!(task_id = %payload.id, "task created");

        let refresh = self.refresh_after(Operation::Create, &payload.id).await;
        Ok(MutationOutcome {
            operation: Operation::Create,
            task_id: payload.id,
            task: Some(created),
            refresh,
        })
    }

    /// Update a task. Whether `id` exists is left to the API.
    pub async fn update(&self, id: &str, patch: TaskPatch) -> Result<MutationOutcome> {
        if let Err(err) = patch.validate() {
            self.report_failure(Operation::Update, Some(id), &err);
            return Err(err);
        }

        let updated = match self.api.update_task(id, &patch).await {
            Ok(task) => task,
            Err(err) => {
                self.report_failure(Operation::Update, Some(id), &err);
                return Err(err);
            }
        };
        tracing::info!(task_id = id, "task updated");

        let refresh = self.refresh_after(Operation::Update, id).await;
        Ok(MutationOutcome {
            operation: Operation::Update,
            task_id: id.to_string(),
            task: Some(updated),
            refresh,
        })
    }

    /// Delete a task, clearing the selection if it pointed at `id`.
    pub async fn delete(&self, id: &str) -> Result<MutationOutcome> {
        if let Err(err) = self.api.delete_task(id).await {
            self.report_failure(Operation::Delete, Some(id), &err);
            return Err(err);
        }
        tracing::info!(task_id = id, "task deleted");

        let cleared = lock(&self.selection).clear_if(id);
        if cleared {
            self.notify(Notification::SelectionChanged { task_id: None });
        }

        let refresh = self.refresh_after(Operation::Delete, id).await;
        Ok(MutationOutcome {
            operation: Operation::Delete,
            task_id: id.to_string(),
            task: None,
            refresh,
        })
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Select `id`. The id does not have to be in the current snapshot.
    pub fn select(&self, id: impl Into<String>) {
        let id = id.into();
        let changed = lock(&self.selection).select(id.clone());
        if changed {
            self.notify(Notification::SelectionChanged { task_id: Some(id) });
        }
    }

    pub fn clear_selection(&self) {
        let changed = lock(&self.selection).clear();
        if changed {
            self.notify(Notification::SelectionChanged { task_id: None });
        }
    }

    pub fn selected_id(&self) -> Option<String> {
        lock(&self.selection).selected_id().map(str::to_string)
    }

    /// The selected task as present in the current snapshot.
    pub fn selected_task(&self) -> Option<Task> {
        let selection = lock(&self.selection);
        let store = lock(&self.store);
        selection.resolve(store.tasks()).cloned()
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    pub fn tasks(&self) -> Vec<Task> {
        lock(&self.store).tasks().to_vec()
    }

    pub fn projects(&self) -> Vec<Project> {
        lock(&self.store).projects().to_vec()
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        lock(&self.store).get(id).cloned()
    }

    pub fn forest(&self) -> Forest {
        lock(&self.store).forest().clone()
    }

    pub fn generation(&self) -> u64 {
        lock(&self.store).generation()
    }

    /// Status counts for the whole snapshot, or one project when given.
    pub fn status_counts(&self, project_id: Option<&str>) -> StatusCounts {
        let store = lock(&self.store);
        match project_id {
            Some(project) => aggregate::status_counts(aggregate::for_project(store.tasks(), project)),
            None => aggregate::status_counts(store.tasks()),
        }
    }

    pub fn group_summaries(&self) -> Vec<GroupSummary> {
        let store = lock(&self.store);
        aggregate::group_summaries(store.tasks(), store.projects())
    }
}

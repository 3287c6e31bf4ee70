//! The task API contract consumed by the client.
//!
//! [`TaskApi`] is the only way records reach or leave the client. The HTTP
//! implementation talks to the REST service; the in-memory one backs tests
//! and local demos.

use async_trait::async_trait;

use crate::error::Result;
use crate::task::{NewTask, Project, Task, TaskPatch};

pub mod http;
pub mod memory;

pub use http::HttpTaskApi;
pub use memory::InMemoryTaskApi;

/// Remote task store.
///
/// Every call is a single request: no retries, no coalescing. Failures are
/// reported as [`crate::Error::Transport`], [`crate::Error::Rejected`],
/// [`crate::Error::NotFound`] or [`crate::Error::Decode`].
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Fetch the full flat task list.
    async fn list_tasks(&self) -> Result<Vec<Task>>;

    /// Fetch the project list used to name task groups.
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Create a task. The service rejects ids that already exist.
    async fn create_task(&self, task: &NewTask) -> Result<Task>;

    /// Apply a partial update to an existing task.
    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Task>;

    /// Remove a task.
    async fn delete_task(&self, id: &str) -> Result<()>;
}

//! tasktree - task hierarchy client library
//!
//! Turns the flat task list served by a task API into a forest keyed by
//! parent/child links, derives status aggregates, and keeps both consistent
//! across create, update and delete requests.
//!
//! # Module Organization
//!
//! - `task`: Task and project records, create payloads and partial updates
//! - `tree`: Forest construction from a flat task list
//! - `aggregate`: Status counts and per-project summaries
//! - `store`: The current snapshot with generation-tagged fetches
//! - `selection`: Selected-task tracking
//! - `coordinator`: Mutations, refetches and notifications
//! - `api`: The task API contract, HTTP and in-memory implementations
//! - `events`: Notifications and the JSONL event sink
//! - `config`: Configuration loading from `.tasktree.toml`
//! - `cli` / `output`: Command-line interface using clap
//! - `error`: Error types and result aliases

pub mod aggregate;
pub mod api;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod output;
pub mod selection;
pub mod store;
pub mod task;
pub mod tree;

pub use coordinator::MutationCoordinator;
pub use error::{Error, Result};

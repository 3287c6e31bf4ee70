//! The client-side task snapshot.
//!
//! The store holds the last applied list from the task API together with the
//! forest derived from it. Snapshots are replaced wholesale, never patched.
//! Every list-fetch takes a [`FetchTicket`] first; only the ticket issued most
//! recently may apply its response, so a slow response cannot overwrite the
//! result of a newer fetch.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::tree::{self, Forest};
use crate::task::{Project, Task};

/// Generation tag handed out when a list-fetch is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// Result of offering a fetched list to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApplyOutcome {
    Applied { generation: u64, tasks: usize },
    /// A newer fetch was issued after this one; the response was dropped.
    Superseded { generation: u64, latest: u64 },
}

impl ApplyOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, ApplyOutcome::Applied { .. })
    }
}

#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
    forest: Forest,
    projects: Vec<Project>,
    issued: u64,
    applied: u64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store already holding `tasks`, as if generation 1 had landed.
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let mut store = Self::new();
        let ticket = store.begin_fetch();
        store.apply(ticket, tasks);
        store
    }

    /// Register a new list-fetch. Any ticket issued earlier becomes stale.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued += 1;
        FetchTicket(self.issued)
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.0 == self.issued
    }

    /// Replace the snapshot with `tasks` if `ticket` is still the latest
    /// issued fetch, rebuilding the forest.
    pub fn apply(&mut self, ticket: FetchTicket, tasks: Vec<Task>) -> ApplyOutcome {
        if !self.is_current(ticket) {
            tracing::warn!(
                generation = ticket.0,
                latest = self.issued,
                "discarding superseded task list"
            );
            return ApplyOutcome::Superseded {
                generation: ticket.0,
                latest: self.issued,
            };
        }

        let tasks = dedupe(tasks);
        self.index = tasks
            .iter()
            .enumerate()
            .map(|(idx, task)| (task.id.clone(), idx))
            .collect();
        self.forest = tree::build_forest(&tasks);
        self.tasks = tasks;
        self.applied = ticket.0;
        tracing::debug!(
            generation = ticket.0,
            tasks = self.tasks.len(),
            roots = self.forest.len(),
            "applied task list"
        );
        ApplyOutcome::Applied {
            generation: ticket.0,
            tasks: self.tasks.len(),
        }
    }

    pub fn set_projects(&mut self, projects: Vec<Project>) {
        self.projects = projects;
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.index.get(id).and_then(|idx| self.tasks.get(*idx))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Generation of the snapshot currently held; 0 before the first apply.
    pub fn generation(&self) -> u64 {
        self.applied
    }
}

/// Keep the first record for each id.
fn dedupe(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen: HashSet<String> = HashSet::with_capacity(tasks.len());
    let before = tasks.len();
    let unique: Vec<Task> = tasks
        .into_iter()
        .filter(|task| seen.insert(task.id.clone()))
        .collect();
    if unique.len() != before {
        tracing::warn!(
            dropped = before - unique.len(),
            "task list contained duplicate ids; kept first occurrence"
        );
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_has_generation_zero() {
        let store = TaskStore::new();
        assert_eq!(store.generation(), 0);
        assert!(store.is_empty());
        assert!(store.forest().is_empty());
    }

    #[test]
    fn apply_rebuilds_index_and_forest() {
        let store = TaskStore::with_tasks(vec![
            Task::new("T1", "root"),
            Task::new("T2", "child").with_parent("T1"),
        ]);
        assert_eq!(store.generation(), 1);
        assert_eq!(store.get("T2").map(|t| t.title.as_str()), Some("child"));
        assert_eq!(store.forest().len(), 1);
        assert_eq!(store.forest()[0].children.len(), 1);
    }

    #[test]
    fn older_ticket_is_superseded() {
        let mut store = TaskStore::new();
        let first = store.begin_fetch();
        let second = store.begin_fetch();

        let newer = store.apply(second, vec![Task::new("T2", "new")]);
        assert!(newer.is_applied());

        let stale = store.apply(first, vec![Task::new("T1", "old")]);
        assert_eq!(stale, ApplyOutcome::Superseded { generation: 1, latest: 2 });
        assert!(store.contains("T2"));
        assert!(!store.contains("T1"));
        assert_eq!(store.generation(), 2);
    }

    #[test]
    fn older_ticket_is_dropped_even_before_newer_lands() {
        let mut store = TaskStore::with_tasks(vec![Task::new("T0", "seed")]);
        let first = store.begin_fetch();
        let _second = store.begin_fetch();

        let outcome = store.apply(first, vec![Task::new("T1", "old")]);
        assert!(!outcome.is_applied());
        assert!(store.contains("T0"));
    }

    #[test]
    fn duplicate_ids_keep_first_record() {
        let store = TaskStore::with_tasks(vec![
            Task::new("T1", "first"),
            Task::new("T1", "second"),
        ]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("T1").map(|t| t.title.as_str()), Some("first"));
    }
}

//! Selected-task tracking.
//!
//! The stored id survives snapshot changes. Resolution is a lookup in the
//! current flat list, so a task that disappears resolves to nothing until it
//! comes back or the selection is cleared.

use crate::task::Task;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    selected: Option<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `id`. Returns true when the stored id changed.
    pub fn select(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.selected.as_deref() == Some(id.as_str()) {
            return false;
        }
        self.selected = Some(id);
        true
    }

    /// Returns true when something was selected.
    pub fn clear(&mut self) -> bool {
        self.selected.take().is_some()
    }

    /// Clear only if `id` is the selected task.
    pub fn clear_if(&mut self, id: &str) -> bool {
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
            true
        } else {
            false
        }
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn resolve<'a>(&self, tasks: &'a [Task]) -> Option<&'a Task> {
        let id = self.selected.as_deref()?;
        tasks.iter().find(|task| task.id == id)
    }
}
